//! Type Mapping
//!
//! The decision table from a JSON Schema `type`/`format` pair plus keywords
//! to a semantic field type and its constraints. Pure: no state, no I/O, no
//! access to the reference graph.
//!
//! | type      | format    | result                                   |
//! |-----------|-----------|------------------------------------------|
//! | `string`  | -         | text                                     |
//! | `string`  | `decimal` | decimal, string-encoded                  |
//! | `integer` | -         | integer, `minimum`/`maximum` as bounds   |
//! | `number`  | -         | float                                    |
//! | `array`   | -         | list of `items.type` (integer or string) |
//! | `object`  | -         | nested class (built by the caller)       |

use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::model::{Constraint, SemanticType};

/// Why a property could not be mapped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("unsupported type '{0}'")]
    UnsupportedType(String),

    #[error("unsupported array item type '{0}'")]
    UnsupportedItemType(String),

    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),

    #[error("invalid `{keyword}`: {reason}")]
    InvalidKeyword {
        keyword: &'static str,
        reason: String,
    },
}

/// Keywords other than `type`/`format` that influence the mapping.
///
/// Held raw: a keyword is only interpreted by the branch of the decision
/// table it applies to, so `number` bounds or a stray `items` never fail.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Keywords<'a> {
    pub minimum: Option<&'a Value>,
    pub maximum: Option<&'a Value>,
    pub item_type: Option<&'a Value>,
}

impl<'a> Keywords<'a> {
    /// Collect the recognized keywords from a property node
    pub fn from_node(node: &'a Value) -> Self {
        Self {
            minimum: node.get("minimum"),
            maximum: node.get("maximum"),
            item_type: node.get("items").and_then(|items| items.get("type")),
        }
    }
}

fn integer_bound(value: Option<&Value>, keyword: &'static str) -> Result<Option<i64>, MappingError> {
    match value {
        None => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| MappingError::InvalidKeyword {
            keyword,
            reason: format!("expected an integer, found {}", value),
        }),
    }
}

/// Outcome of mapping one property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// A field of a scalar or sequence type
    Field {
        semantic_type: SemanticType,
        constraints: BTreeSet<Constraint>,
    },
    /// An inline object; the caller materializes it as a nested class
    Object,
}

impl Mapping {
    fn field(semantic_type: SemanticType) -> Self {
        Mapping::Field {
            semantic_type,
            constraints: BTreeSet::new(),
        }
    }
}

/// Map a JSON Schema type/format pair and keywords to a field type
pub fn map_type(
    json_type: &str,
    format: Option<&str>,
    keywords: &Keywords<'_>,
) -> Result<Mapping, MappingError> {
    match json_type {
        "string" => match format {
            None => Ok(Mapping::field(SemanticType::Text)),
            Some("decimal") => Ok(Mapping::Field {
                semantic_type: SemanticType::Decimal,
                constraints: [Constraint::StringEncoded].into_iter().collect(),
            }),
            Some(other) => Err(MappingError::UnsupportedFormat(other.to_string())),
        },
        "integer" => {
            let mut constraints = BTreeSet::new();
            if let Some(minimum) = integer_bound(keywords.minimum, "minimum")? {
                constraints.insert(Constraint::Minimum(minimum));
            }
            if let Some(maximum) = integer_bound(keywords.maximum, "maximum")? {
                constraints.insert(Constraint::Maximum(maximum));
            }
            Ok(Mapping::Field {
                semantic_type: SemanticType::Integer,
                constraints,
            })
        }
        "number" => Ok(Mapping::field(SemanticType::Float)),
        "object" => Ok(Mapping::Object),
        "array" => {
            let item_type = match keywords.item_type {
                None => {
                    return Err(MappingError::InvalidKeyword {
                        keyword: "items.type",
                        reason: "array properties must declare an item type".to_string(),
                    })
                }
                Some(Value::String(item_type)) => item_type.as_str(),
                Some(other) => {
                    return Err(MappingError::InvalidKeyword {
                        keyword: "items.type",
                        reason: format!("expected a string, found {}", other),
                    })
                }
            };
            let element = match item_type {
                "integer" => SemanticType::Integer,
                "string" => SemanticType::Text,
                other => return Err(MappingError::UnsupportedItemType(other.to_string())),
            };
            Ok(Mapping::field(SemanticType::List(Box::new(element))))
        }
        other => Err(MappingError::UnsupportedType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(node: Value) -> Result<Mapping, MappingError> {
        let keywords = Keywords::from_node(&node);
        let json_type = node["type"].as_str().unwrap_or_default();
        map_type(json_type, node.get("format").and_then(Value::as_str), &keywords)
    }

    fn field_of(mapping: Mapping) -> (SemanticType, BTreeSet<Constraint>) {
        match mapping {
            Mapping::Field {
                semantic_type,
                constraints,
            } => (semantic_type, constraints),
            other => panic!("Expected a field mapping, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_string() {
        let (ty, constraints) = field_of(map(json!({"type": "string"})).unwrap());
        assert_eq!(ty, SemanticType::Text);
        assert!(constraints.is_empty());
    }

    #[test]
    fn test_decimal_string() {
        let (ty, constraints) =
            field_of(map(json!({"type": "string", "format": "decimal"})).unwrap());
        assert_eq!(ty, SemanticType::Decimal);
        assert!(constraints.contains(&Constraint::StringEncoded));
    }

    #[test]
    fn test_unknown_string_format() {
        let err = map(json!({"type": "string", "format": "date-time"})).unwrap_err();
        assert_eq!(err, MappingError::UnsupportedFormat("date-time".to_string()));
    }

    #[test]
    fn test_integer_bounds() {
        let (ty, constraints) =
            field_of(map(json!({"type": "integer", "minimum": 0, "maximum": 10})).unwrap());
        assert_eq!(ty, SemanticType::Integer);
        assert!(constraints.contains(&Constraint::Minimum(0)));
        assert!(constraints.contains(&Constraint::Maximum(10)));

        let (_, only_min) = field_of(map(json!({"type": "integer", "minimum": -5})).unwrap());
        assert_eq!(only_min.len(), 1);
        assert!(only_min.contains(&Constraint::Minimum(-5)));

        let (_, none) = field_of(map(json!({"type": "integer"})).unwrap());
        assert!(none.is_empty());
    }

    #[test]
    fn test_fractional_bound_is_rejected() {
        let err = map(json!({"type": "integer", "maximum": 2.5})).unwrap_err();
        assert!(matches!(err, MappingError::InvalidKeyword { keyword: "maximum", .. }));
    }

    #[test]
    fn test_number_has_no_constraints() {
        let (ty, constraints) =
            field_of(map(json!({"type": "number", "minimum": 0, "maximum": 1})).unwrap());
        assert_eq!(ty, SemanticType::Float);
        assert!(constraints.is_empty());

        let (ty, constraints) =
            field_of(map(json!({"type": "number", "minimum": 0.5, "maximum": 99.5})).unwrap());
        assert_eq!(ty, SemanticType::Float);
        assert!(constraints.is_empty());
    }

    #[test]
    fn test_keywords_of_other_types_are_ignored() {
        let (ty, _) = field_of(map(json!({"type": "string", "minimum": "a", "items": {"type": 3}})).unwrap());
        assert_eq!(ty, SemanticType::Text);
    }

    #[test]
    fn test_non_string_item_type() {
        let err = map(json!({"type": "array", "items": {"type": 3}})).unwrap_err();
        assert!(matches!(err, MappingError::InvalidKeyword { keyword: "items.type", .. }));
    }

    #[test]
    fn test_arrays() {
        let (ints, _) = field_of(map(json!({"type": "array", "items": {"type": "integer"}})).unwrap());
        assert_eq!(ints, SemanticType::List(Box::new(SemanticType::Integer)));

        let (strings, _) =
            field_of(map(json!({"type": "array", "items": {"type": "string"}})).unwrap());
        assert_eq!(strings, SemanticType::List(Box::new(SemanticType::Text)));
    }

    #[test]
    fn test_unsupported_array_item_type() {
        let err = map(json!({"type": "array", "items": {"type": "boolean"}})).unwrap_err();
        assert_eq!(err, MappingError::UnsupportedItemType("boolean".to_string()));
    }

    #[test]
    fn test_array_without_item_type() {
        let err = map(json!({"type": "array"})).unwrap_err();
        assert!(matches!(err, MappingError::InvalidKeyword { keyword: "items.type", .. }));
    }

    #[test]
    fn test_object_is_deferred_to_caller() {
        assert_eq!(map(json!({"type": "object"})).unwrap(), Mapping::Object);
    }

    #[test]
    fn test_unsupported_type() {
        let err = map(json!({"type": "boolean"})).unwrap_err();
        assert_eq!(err, MappingError::UnsupportedType("boolean".to_string()));
    }
}
