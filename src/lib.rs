//! JSON Schema Class Generator
//!
//! Compiles a directory of JSON Schema documents into a language-agnostic
//! class model and emits source code from it.
//!
//! ## Features
//!
//! - **Identity-based naming**: `$id` URIs become namespaces, type names and versions
//! - **Reference resolution**: relative and absolute `$ref`s, resolved per document
//! - **Memoized materialization**: one class per identity, cycles rejected explicitly
//! - **Constraints**: `required`, integer bounds and decimal encoding carried into the model
//! - **Emitters**: Rust structs (serde + validator) or the model itself as JSON
//!
//! ## Architecture
//!
//! ```text
//! schemas/**/*.json
//!   └─ loader ─► SchemaRegistry ─► ClassModelBuilder ─► ClassModel ─► Emitter
//!                 (identity.rs)      (types.rs)                        (emit/)
//! ```

pub mod builder;
pub mod checksum;
pub mod config;
pub mod emit;
pub mod error;
pub mod generator;
pub mod identity;
pub mod loader;
pub mod model;
pub mod naming;
pub mod registry;
pub mod types;

pub use builder::ClassModelBuilder;
pub use checksum::ModelFingerprint;
pub use config::GeneratorConfig;
pub use emit::{EmitReport, EmitTarget, Emitter, JsonEmitter, RustEmitter};
pub use error::{ErrorKind, GenerateError, Result};
pub use generator::{build_model, generate, generate_with_config, inspect, GenerationReport};
pub use identity::{Identity, SchemaId};
pub use model::{ClassDefinition, ClassModel, Constraint, FieldDefinition, QualifiedName, SemanticType};
pub use registry::{SchemaRegistry, SourceDocument};
