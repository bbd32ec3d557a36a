//! Emitters
//!
//! An emitter turns a finished [`ClassModel`] into files under a destination
//! directory. Emitters only ever see the model, never schema JSON, and run
//! only after the whole model has been built.

pub mod json;
pub mod rust;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GenerateError, Result};
use crate::model::ClassModel;

pub use json::JsonEmitter;
pub use rust::RustEmitter;

/// Renders a class model to files
pub trait Emitter {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Write the model under `destination`
    fn emit(&self, model: &ClassModel, destination: &Path) -> Result<EmitReport>;
}

/// Files written by one emitter run, in write order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    pub files: Vec<PathBuf>,
}

impl EmitReport {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Output target selectable from configuration and the command line
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum EmitTarget {
    /// Rust structs with serde and validator attributes
    #[default]
    Rust,
    /// The class model itself as JSON
    Json,
}

impl EmitTarget {
    pub fn emitter(self) -> Box<dyn Emitter> {
        match self {
            EmitTarget::Rust => Box::new(RustEmitter::new()),
            EmitTarget::Json => Box::new(JsonEmitter::new()),
        }
    }
}

impl fmt::Display for EmitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitTarget::Rust => write!(f, "rust"),
            EmitTarget::Json => write!(f, "json"),
        }
    }
}

/// Write a file, creating parent directories as needed
pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GenerateError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| GenerateError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        assert_eq!(EmitTarget::default(), EmitTarget::Rust);
        assert_eq!(EmitTarget::Rust.emitter().name(), "rust");
        assert_eq!(EmitTarget::Json.emitter().name(), "json");
        assert_eq!(EmitTarget::Json.to_string(), "json");
    }

    #[test]
    fn test_target_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            target: EmitTarget,
        }
        let wrapper: Wrapper = toml::from_str("target = \"json\"").unwrap();
        assert_eq!(wrapper.target, EmitTarget::Json);
    }
}
