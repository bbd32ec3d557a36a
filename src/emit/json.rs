//! JSON model emitter
//!
//! Writes the whole class model, its fingerprint and emission order to
//! `class-model.json` for tooling that wants the model rather than code.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::{write_file, EmitReport, Emitter};
use crate::checksum::ModelFingerprint;
use crate::error::{GenerateError, Result};
use crate::identity::SchemaId;
use crate::model::ClassModel;

/// File name written under the destination
pub const MODEL_FILE: &str = "class-model.json";

#[derive(Serialize)]
struct ModelDocument<'a> {
    fingerprint: ModelFingerprint,
    emission_order: Vec<&'a SchemaId>,
    model: &'a ClassModel,
}

/// Serializes the class model as pretty-printed JSON
#[derive(Debug, Clone, Default)]
pub struct JsonEmitter;

impl JsonEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for JsonEmitter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn emit(&self, model: &ClassModel, destination: &Path) -> Result<EmitReport> {
        let path = destination.join(MODEL_FILE);
        let document = ModelDocument {
            fingerprint: model.fingerprint()?,
            emission_order: model.emission_order(),
            model,
        };
        let content = serde_json::to_string_pretty(&document).map_err(|e| GenerateError::Json {
            path: path.clone(),
            source: e,
        })?;
        write_file(&path, &content)?;
        debug!(file = %path.display(), classes = model.len(), "emitted class model");

        Ok(EmitReport { files: vec![path] })
    }
}
