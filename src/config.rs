//! Configuration management for the class generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (classgen.toml)
//! - The per-user config directory
//! - Environment variables (CLASSGEN__*)
//!
//! ## Example config file (classgen.toml):
//! ```toml
//! source_path = "schemas"
//! destination_path = "src/generated"
//! target = "rust"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::emit::EmitTarget;
use crate::error::{GenerateError, Result};

/// Settings consumed by the generation driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Directory tree holding the schema documents
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,

    /// Directory the emitter writes into
    #[serde(default = "default_destination_path")]
    pub destination_path: PathBuf,

    /// Which emitter to run
    #[serde(default)]
    pub target: EmitTarget,
}

fn default_source_path() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_destination_path() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            source_path: default_source_path(),
            destination_path: default_destination_path(),
            target: EmitTarget::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        Self::build(config_path, true)
    }

    /// Load a single config file over the defaults, ignoring the working
    /// directory, the user config directory and the environment
    pub fn load_file(path: &Path) -> Result<Self> {
        Self::build(Some(path), false)
    }

    fn build(config_path: Option<&Path>, ambient: bool) -> Result<Self> {
        let mut builder = Config::builder();

        if ambient {
            let config_locations = ["classgen.toml", ".classgen.toml", "config/classgen.toml"];
            for location in config_locations {
                builder = builder.add_source(File::with_name(location).required(false));
            }

            if let Some(config_dir) = directories::ProjectDirs::from("dev", "classgen", "classgen") {
                let user_config = config_dir.config_dir().join("classgen.toml");
                if user_config.exists() {
                    builder = builder.add_source(File::from(user_config).required(false));
                }
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // CLASSGEN__SOURCE_PATH, CLASSGEN__TARGET, ...
        if ambient {
            builder = builder.add_source(
                Environment::with_prefix("CLASSGEN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            GenerateError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        std::fs::write(path, content).map_err(|e| GenerateError::io(path, e))
    }
}
