//! Schema Registry
//!
//! Indexes every loaded schema document by its absolute identity and tracks
//! whether it has been materialized into a class. Populated once during load,
//! consulted (never re-populated) during build.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde_json::Value;
use tracing::debug;

use crate::error::{GenerateError, Result};
use crate::identity::{Identity, IdentityError, SchemaId};
use crate::model::ClassRef;

/// One schema document as handed over by source discovery
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub location: PathBuf,
    pub root: Value,
}

impl SourceDocument {
    pub fn new(location: impl Into<PathBuf>, root: Value) -> Self {
        Self {
            location: location.into(),
            root,
        }
    }
}

/// Materialization state of a registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialization {
    Unprocessed,
    /// Class construction has started but not finished; reaching this state
    /// again through a reference means the reference graph has a cycle
    Building,
    Processed(ClassRef),
}

/// A loaded schema document and its materialization state
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    pub location: PathBuf,
    pub root: Arc<Value>,
    pub identity: Identity,
    state: Materialization,
}

impl ParsedSchema {
    pub fn state(&self) -> &Materialization {
        &self.state
    }

    pub fn is_processed(&self) -> bool {
        matches!(self.state, Materialization::Processed(_))
    }

    pub fn is_building(&self) -> bool {
        matches!(self.state, Materialization::Building)
    }

    /// The class this schema was materialized into, once processed
    pub fn built_class(&self) -> Option<&ClassRef> {
        match &self.state {
            Materialization::Processed(class_ref) => Some(class_ref),
            _ => None,
        }
    }
}

/// Identity-keyed index of schema documents
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<SchemaId, ParsedSchema>,
}

impl SchemaRegistry {
    /// Index every document by the identity derived from its `$id`
    pub fn load(documents: impl IntoIterator<Item = SourceDocument>) -> Result<Self> {
        let mut registry = Self::default();
        for document in documents {
            registry.insert(document)?;
        }
        debug!(count = registry.len(), "schema registry loaded");
        Ok(registry)
    }

    fn insert(&mut self, document: SourceDocument) -> Result<()> {
        let location = document.location.display().to_string();

        let raw_id = match document.root.get("$id") {
            Some(Value::String(raw)) => raw.clone(),
            Some(other) => {
                return Err(GenerateError::InvalidSchemaId {
                    location,
                    id: other.to_string(),
                    reason: "$id must be a string".to_string(),
                })
            }
            None => {
                return Err(GenerateError::InvalidSchemaId {
                    location,
                    id: String::new(),
                    reason: "document has no $id".to_string(),
                })
            }
        };

        let identity = Identity::resolve(&raw_id).map_err(|err| match err {
            IdentityError::InvalidSchemaId { reason } => GenerateError::InvalidSchemaId {
                location: location.clone(),
                id: raw_id.clone(),
                reason,
            },
            IdentityError::MalformedIdentityPath { reason } => {
                GenerateError::MalformedIdentityPath {
                    location: location.clone(),
                    id: raw_id.clone(),
                    reason,
                }
            }
        })?;

        let key = identity.key();
        if let Some(existing) = self.schemas.get(&key) {
            return Err(GenerateError::DuplicateIdentity {
                id: key,
                first: existing.location.display().to_string(),
                second: location,
            });
        }

        debug!(id = %key, location = %location, class = %identity.qualified_class_name(), "indexed schema");
        self.schemas.insert(
            key,
            ParsedSchema {
                location: document.location,
                root: Arc::new(document.root),
                identity,
                state: Materialization::Unprocessed,
            },
        );
        Ok(())
    }

    /// Schema for an absolute identity locator
    pub fn get(&self, id: &str) -> Result<&ParsedSchema> {
        self.lookup(id)
            .ok_or_else(|| GenerateError::UnresolvedReference {
                location: String::new(),
                pointer: String::new(),
                reference: id.to_string(),
                resolved: id.to_string(),
                suggestion: self.suggest(id),
            })
    }

    /// Schema for an identity locator, if registered
    pub fn lookup(&self, id: &str) -> Option<&ParsedSchema> {
        self.schemas.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.schemas.contains_key(id)
    }

    /// Flip an entry from unprocessed to building
    pub fn mark_building(&mut self, id: &str) -> Result<()> {
        let schema = self.entry_mut(id)?;
        match schema.state {
            Materialization::Unprocessed => {
                schema.state = Materialization::Building;
                Ok(())
            }
            Materialization::Building => Err(GenerateError::CyclicReference {
                location: schema.location.display().to_string(),
                pointer: String::new(),
                chain: vec![id.to_string(), id.to_string()],
            }),
            Materialization::Processed(_) => Err(GenerateError::InvariantViolation {
                id: id.to_string(),
                reason: "schema is already processed and cannot be built again".to_string(),
            }),
        }
    }

    /// Record the class a schema was materialized into.
    ///
    /// Idempotent for the same class; a different class for an already
    /// processed id means a schema was materialized twice.
    pub fn mark_processed(&mut self, id: &str, class_ref: ClassRef) -> Result<()> {
        let schema = self.entry_mut(id)?;
        if let Materialization::Processed(existing) = &schema.state {
            if *existing == class_ref {
                return Ok(());
            }
            return Err(GenerateError::InvariantViolation {
                id: id.to_string(),
                reason: format!(
                    "already materialized as {}, refusing {}",
                    existing.name, class_ref.name
                ),
            });
        }
        debug!(id = %id, class = %class_ref.name, "schema processed");
        schema.state = Materialization::Processed(class_ref);
        Ok(())
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut ParsedSchema> {
        self.schemas
            .get_mut(id)
            .ok_or_else(|| GenerateError::InvariantViolation {
                id: id.to_string(),
                reason: "schema is not registered".to_string(),
            })
    }

    /// Ids still waiting to be materialized, in locator order
    pub fn unprocessed(&self) -> Vec<SchemaId> {
        self.schemas
            .iter()
            .filter(|(_, schema)| schema.state == Materialization::Unprocessed)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SchemaId> {
        self.schemas.keys()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Closest registered id to an unknown one, for error hints
    pub fn suggest(&self, id: &str) -> Option<SchemaId> {
        let matcher = SkimMatcherV2::default();
        self.schemas
            .keys()
            .filter_map(|candidate| matcher.fuzzy_match(candidate, id).map(|score| (score, candidate)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, candidate)| candidate.clone())
    }
}
