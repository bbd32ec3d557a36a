//! Generation Driver
//!
//! Discover → load → build → emit. Any failure before emission aborts the run
//! with nothing written, so a destination only ever receives a complete and
//! consistent class model.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::builder::ClassModelBuilder;
use crate::checksum::ModelFingerprint;
use crate::config::GeneratorConfig;
use crate::emit::{EmitReport, Emitter};
use crate::error::Result;
use crate::loader;
use crate::model::ClassModel;
use crate::registry::{SchemaRegistry, SourceDocument};

/// Summary of a generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Schema documents loaded into the registry
    pub documents: usize,
    /// Top-level classes in the model
    pub classes: usize,
    pub emitted: EmitReport,
    pub fingerprint: ModelFingerprint,
}

/// Load documents into a fresh registry and build the complete class model
pub fn build_model(documents: impl IntoIterator<Item = SourceDocument>) -> Result<ClassModel> {
    let mut registry = SchemaRegistry::load(documents)?;
    ClassModelBuilder::new(&mut registry).build_all()
}

/// Discover the source tree and build its class model without emitting
pub fn inspect(source: &Path) -> Result<ClassModel> {
    build_model(loader::discover(source)?)
}

/// Generate from `source` into `destination` with the given emitter
pub fn generate(source: &Path, destination: &Path, emitter: &dyn Emitter) -> Result<GenerationReport> {
    let documents = loader::discover(source)?;
    let document_count = documents.len();
    let model = build_model(documents)?;
    let fingerprint = model.fingerprint()?;

    let emitted = emitter.emit(&model, destination)?;

    info!(
        documents = document_count,
        classes = model.len(),
        files = emitted.len(),
        emitter = emitter.name(),
        fingerprint = fingerprint.short(),
        "generation complete"
    );

    Ok(GenerationReport {
        documents: document_count,
        classes: model.len(),
        emitted,
        fingerprint,
    })
}

/// Generate using the paths and target from configuration
pub fn generate_with_config(config: &GeneratorConfig) -> Result<GenerationReport> {
    let emitter = config.target.emitter();
    generate(&config.source_path, &config.destination_path, emitter.as_ref())
}
