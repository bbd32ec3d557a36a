//! Model fingerprints
//!
//! A SHA256 over the canonical JSON form of a [`ClassModel`]. Two runs over
//! the same source tree must produce the same fingerprint regardless of the
//! order documents were discovered or classes were built.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::model::ClassModel;

/// SHA256 fingerprint of a class model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelFingerprint(String);

impl ModelFingerprint {
    /// Compute a fingerprint from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute the fingerprint of a model.
    ///
    /// The model is keyed by identity and its fields keep document order, so
    /// its JSON serialization is already canonical.
    pub fn of(model: &ClassModel) -> serde_json::Result<Self> {
        let canonical = serde_json::to_vec(model)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    /// Verify that a model matches this fingerprint
    pub fn verify(&self, model: &ClassModel) -> bool {
        matches!(Self::of(model), Ok(fingerprint) if fingerprint == *self)
    }
}

impl fmt::Display for ModelFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ModelFingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDefinition, QualifiedName};

    fn model_with(type_name: &str) -> ClassModel {
        let mut model = ClassModel::new();
        let name = QualifiedName::top_level(vec!["com".into(), "example".into()], type_name);
        model.insert(format!("https://example.com/{}/1", type_name), ClassDefinition::new(name));
        model
    }

    #[test]
    fn test_fingerprint_consistency() {
        let model = model_with("Person");
        let fingerprint = ModelFingerprint::of(&model).unwrap();
        assert_eq!(fingerprint, ModelFingerprint::of(&model.clone()).unwrap());
        assert_eq!(fingerprint.as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_different_content() {
        assert_ne!(
            ModelFingerprint::of(&model_with("Person")).unwrap(),
            ModelFingerprint::of(&model_with("Address")).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_covers_serialized_model() {
        let model = model_with("Person");
        let fingerprint = ModelFingerprint::of(&model).unwrap();
        assert_eq!(fingerprint, ModelFingerprint::from_bytes(&serde_json::to_vec(&model).unwrap()));
        assert_ne!(fingerprint, ModelFingerprint::from_bytes(&[]));
    }

    #[test]
    fn test_fingerprint_verification() {
        let model = model_with("Person");
        let fingerprint = model.fingerprint().unwrap();
        assert!(fingerprint.verify(&model));
        assert!(!fingerprint.verify(&model_with("Address")));
        assert_eq!(fingerprint.short().len(), 12);
    }
}
