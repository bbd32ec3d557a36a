//! Class Model
//!
//! The language-agnostic output of the builder: top-level class definitions
//! keyed by identity, each owning its fields and nested classes.
//!
//! Key principle: emitters NEVER read schema JSON - only the class model.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use crate::checksum::ModelFingerprint;
use crate::error::GenerateError;
use crate::identity::SchemaId;
use crate::naming::to_lower_camel_case;

// =============================================================================
// Names
// =============================================================================

/// Namespace plus the class path within it.
///
/// `path` is `[Person]` for a top-level class and `[Person, Address]` for a
/// class nested in `Person`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub namespace: Vec<String>,
    pub path: Vec<String>,
}

impl QualifiedName {
    pub fn top_level(namespace: Vec<String>, type_name: impl Into<String>) -> Self {
        Self {
            namespace,
            path: vec![type_name.into()],
        }
    }

    /// Name of a class nested directly inside this one
    pub fn nested(&self, type_name: impl Into<String>) -> Self {
        let mut path = self.path.clone();
        path.push(type_name.into());
        Self {
            namespace: self.namespace.clone(),
            path,
        }
    }

    /// Last path segment
    pub fn simple_name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_nested(&self) -> bool {
        self.path.len() > 1
    }

    /// Name of the top-level class this one lives in (itself if top-level)
    pub fn outermost(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            path: self.path.iter().take(1).cloned().collect(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self
            .namespace
            .iter()
            .chain(self.path.iter())
            .map(String::as_str)
            .collect();
        write!(f, "{}", parts.join("."))
    }
}

// =============================================================================
// Field Types and Constraints
// =============================================================================

/// Semantic type of a field, independent of any target language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum SemanticType {
    /// Free text
    Text,
    /// Fixed-precision decimal
    Decimal,
    /// Bounded whole number
    Integer,
    /// Floating point
    Float,
    /// Ordered sequence, default-initialized to empty
    List(Box<SemanticType>),
    /// Another class in the model (top-level or nested)
    Class(QualifiedName),
}

impl SemanticType {
    pub fn is_text(&self) -> bool {
        matches!(self, SemanticType::Text)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, SemanticType::List(_))
    }

    /// The class this type refers to, looking through lists
    pub fn referenced_class(&self) -> Option<&QualifiedName> {
        match self {
            SemanticType::Class(name) => Some(name),
            SemanticType::List(inner) => inner.referenced_class(),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Text => write!(f, "text"),
            SemanticType::Decimal => write!(f, "decimal"),
            SemanticType::Integer => write!(f, "integer"),
            SemanticType::Float => write!(f, "float"),
            SemanticType::List(inner) => write!(f, "list<{}>", inner),
            SemanticType::Class(name) => write!(f, "{}", name),
        }
    }
}

/// Validation constraint attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Minimum(i64),
    Maximum(i64),
    NonEmpty,
    NonNull,
    /// Serialized as a JSON string rather than a number
    StringEncoded,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Minimum(value) => write!(f, "minimum({})", value),
            Constraint::Maximum(value) => write!(f, "maximum({})", value),
            Constraint::NonEmpty => write!(f, "non-empty"),
            Constraint::NonNull => write!(f, "non-null"),
            Constraint::StringEncoded => write!(f, "string-encoded"),
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// A field in a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Normalized identifier (lowerCamelCase)
    pub name: String,
    /// Property name as written in the schema
    pub json_name: String,
    pub semantic_type: SemanticType,
    pub required: bool,
    pub constraints: BTreeSet<Constraint>,
}

impl FieldDefinition {
    pub fn new(
        json_name: impl Into<String>,
        semantic_type: SemanticType,
        constraints: BTreeSet<Constraint>,
    ) -> Self {
        let json_name = json_name.into();
        Self {
            name: to_lower_camel_case(&json_name),
            json_name,
            semantic_type,
            required: false,
            constraints,
        }
    }

    /// Mark as required: text must be non-empty, everything else non-null
    pub fn mark_required(&mut self) {
        self.required = true;
        if self.semantic_type.is_text() {
            self.constraints.insert(Constraint::NonEmpty);
        } else {
            self.constraints.insert(Constraint::NonNull);
        }
    }

    pub fn has_constraint(&self, constraint: Constraint) -> bool {
        self.constraints.contains(&constraint)
    }

    /// Lower bound, if any
    pub fn minimum(&self) -> Option<i64> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Minimum(value) => Some(*value),
            _ => None,
        })
    }

    /// Upper bound, if any
    pub fn maximum(&self) -> Option<i64> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Maximum(value) => Some(*value),
            _ => None,
        })
    }

    /// List fields start out as an empty sequence rather than absent
    pub fn defaults_to_empty(&self) -> bool {
        self.semantic_type.is_list()
    }
}

/// A class definition; nested classes are owned exclusively by their parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: QualifiedName,
    /// Identity the class was materialized from (top-level only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<SchemaId>,
    /// Version segment of the identity (top-level only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Document the class was loaded from (top-level only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_classes: Vec<ClassDefinition>,
}

impl ClassDefinition {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            schema_id: None,
            version: None,
            source: None,
            fields: Vec::new(),
            nested_classes: Vec::new(),
        }
    }

    /// Field by normalized name
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Directly nested class by simple name
    pub fn nested_class(&self, simple_name: &str) -> Option<&ClassDefinition> {
        self.nested_classes
            .iter()
            .find(|c| c.name.simple_name() == simple_name)
    }

    /// Every class referenced by a field of this class or its nested classes
    pub fn referenced_classes(&self) -> Vec<&QualifiedName> {
        let mut refs: Vec<&QualifiedName> = self
            .fields
            .iter()
            .filter_map(|f| f.semantic_type.referenced_class())
            .collect();
        for nested in &self.nested_classes {
            refs.extend(nested.referenced_classes());
        }
        refs
    }
}

/// Reference to a materialized top-level class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRef {
    pub id: SchemaId,
    pub name: QualifiedName,
}

// =============================================================================
// Class Model
// =============================================================================

/// The completed set of top-level classes, one per identity.
///
/// Keyed by identity locator, so iteration order does not depend on the
/// order classes were built in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassModel {
    classes: BTreeMap<SchemaId, ClassDefinition>,
}

impl ClassModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a class, returning the previous definition for the id if any
    pub(crate) fn insert(&mut self, id: SchemaId, class: ClassDefinition) -> Option<ClassDefinition> {
        self.classes.insert(id, class)
    }

    pub fn get(&self, id: &str) -> Option<&ClassDefinition> {
        self.classes.get(id)
    }

    /// Top-level class by its dot-joined qualified name
    pub fn find(&self, qualified_name: &str) -> Option<&ClassDefinition> {
        self.classes
            .values()
            .find(|c| c.name.to_string() == qualified_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaId, &ClassDefinition)> {
        self.classes.iter()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Ids in dependency order: a referenced class comes before its referrers.
    ///
    /// Falls back to locator order if the model contains a cycle, which the
    /// builder never produces but a deserialized model might.
    pub fn emission_order(&self) -> Vec<&SchemaId> {
        let mut graph: DiGraph<&SchemaId, ()> = DiGraph::with_capacity(self.len(), self.len());
        let mut by_name = HashMap::with_capacity(self.len());
        for (id, class) in &self.classes {
            let idx = graph.add_node(id);
            by_name.insert(&class.name, idx);
        }

        for class in self.classes.values() {
            let Some(&referrer) = by_name.get(&class.name) else {
                continue;
            };
            for referenced in class.referenced_classes() {
                let outer = referenced.outermost();
                if outer == class.name {
                    continue;
                }
                if let Some(&target) = by_name.get(&outer) {
                    graph.update_edge(target, referrer, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|idx| graph[idx]).collect(),
            Err(_) => self.classes.keys().collect(),
        }
    }

    /// Content fingerprint of the whole model
    pub fn fingerprint(&self) -> Result<ModelFingerprint, GenerateError> {
        ModelFingerprint::of(self).map_err(GenerateError::ModelSerialization)
    }
}
