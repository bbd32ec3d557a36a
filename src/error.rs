//! Error types for class model generation

use std::path::PathBuf;

use thiserror::Error;

use crate::identity::SchemaId;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Generation errors
///
/// Every variant is terminal for the run. Builder errors carry the document
/// location and a JSON pointer to the offending property.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Invalid schema $id '{id}' in {location}: {reason}")]
    InvalidSchemaId {
        location: String,
        id: String,
        reason: String,
    },

    #[error("Malformed identity path in $id '{id}' ({location}): {reason}")]
    MalformedIdentityPath {
        location: String,
        id: String,
        reason: String,
    },

    #[error("Duplicate schema identity {id}: declared by {first} and {second}")]
    DuplicateIdentity {
        id: SchemaId,
        first: String,
        second: String,
    },

    #[error("Unresolved reference '{reference}' (resolved to {resolved}) at {location}#{pointer}{}", did_you_mean(.suggestion))]
    UnresolvedReference {
        location: String,
        pointer: String,
        reference: String,
        resolved: String,
        suggestion: Option<SchemaId>,
    },

    #[error("Cyclic reference at {location}#{pointer}: {}", .chain.join(" -> "))]
    CyclicReference {
        location: String,
        pointer: String,
        chain: Vec<SchemaId>,
    },

    #[error("Unsupported type '{type_name}' at {location}#{pointer}")]
    UnsupportedType {
        location: String,
        pointer: String,
        type_name: String,
    },

    #[error("Unsupported string format '{format}' at {location}#{pointer}")]
    UnsupportedFormat {
        location: String,
        pointer: String,
        format: String,
    },

    #[error("Required property '{name}' has no matching field at {location}#{pointer}")]
    MissingRequiredFieldDeclaration {
        location: String,
        pointer: String,
        name: String,
    },

    #[error("Materialization invariant violated for {id}: {reason}")]
    InvariantViolation { id: SchemaId, reason: String },

    #[error("Malformed schema at {location}#{pointer}: {reason}")]
    MalformedSchema {
        location: String,
        pointer: String,
        reason: String,
    },

    #[error("Duplicate member '{name}' at {location}#{pointer}")]
    DuplicateMember {
        location: String,
        pointer: String,
        name: String,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize class model: {0}")]
    ModelSerialization(#[source] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

/// Fieldless view of [`GenerateError`], for matching on the failure kind alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidSchemaId,
    MalformedIdentityPath,
    DuplicateIdentity,
    UnresolvedReference,
    CyclicReference,
    UnsupportedType,
    UnsupportedFormat,
    MissingRequiredFieldDeclaration,
    InvariantViolation,
    MalformedSchema,
    DuplicateMember,
    Io,
    Json,
    Config,
}

impl GenerateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSchemaId { .. } => ErrorKind::InvalidSchemaId,
            Self::MalformedIdentityPath { .. } => ErrorKind::MalformedIdentityPath,
            Self::DuplicateIdentity { .. } => ErrorKind::DuplicateIdentity,
            Self::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Self::CyclicReference { .. } => ErrorKind::CyclicReference,
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::MissingRequiredFieldDeclaration { .. } => ErrorKind::MissingRequiredFieldDeclaration,
            Self::InvariantViolation { .. } => ErrorKind::InvariantViolation,
            Self::MalformedSchema { .. } => ErrorKind::MalformedSchema,
            Self::DuplicateMember { .. } => ErrorKind::DuplicateMember,
            Self::Io { .. } => ErrorKind::Io,
            Self::Json { .. } | Self::ModelSerialization(_) => ErrorKind::Json,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn did_you_mean(suggestion: &Option<SchemaId>) -> String {
    match suggestion {
        Some(id) => format!(" (did you mean {}?)", id),
        None => String::new(),
    }
}
