//! Class Model Builder
//!
//! Turns registry entries into class definitions, recursively and memoized
//! through the registry's materialization state:
//!
//! - `$ref` properties resolve against the reference base of the document
//!   being walked, which is passed down explicitly with every call
//! - inline `object` properties become nested classes owned by their parent
//! - `required` is applied as a second pass once all fields exist
//!
//! A reference that reaches a schema still in the `Building` state is a
//! cycle and fails immediately instead of recursing.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{GenerateError, Result};
use crate::identity::{canonical_id, Identity, SchemaId};
use crate::model::{ClassDefinition, ClassModel, ClassRef, FieldDefinition, QualifiedName, SemanticType};
use crate::naming::{to_lower_camel_case, to_upper_camel_case};
use crate::registry::{Materialization, SchemaRegistry};
use crate::types::{map_type, Keywords, Mapping, MappingError};

// =============================================================================
// Document Context
// =============================================================================

/// The schema document currently being walked.
///
/// Relative references inside a document resolve against that document's own
/// identity, so every recursive call receives the context it belongs to.
struct Document {
    identity: Identity,
    location: PathBuf,
    root: Arc<Value>,
}

impl Document {
    fn location(&self) -> String {
        self.location.display().to_string()
    }

    fn malformed(&self, pointer: &str, reason: impl Into<String>) -> GenerateError {
        GenerateError::MalformedSchema {
            location: self.location(),
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    fn mapping_error(&self, pointer: &str, err: MappingError) -> GenerateError {
        match err {
            MappingError::UnsupportedType(type_name) => GenerateError::UnsupportedType {
                location: self.location(),
                pointer: pointer.to_string(),
                type_name,
            },
            MappingError::UnsupportedItemType(type_name) => GenerateError::UnsupportedType {
                location: self.location(),
                pointer: format!("{}/items", pointer),
                type_name,
            },
            MappingError::UnsupportedFormat(format) => GenerateError::UnsupportedFormat {
                location: self.location(),
                pointer: pointer.to_string(),
                format,
            },
            err @ MappingError::InvalidKeyword { .. } => self.malformed(pointer, err.to_string()),
        }
    }
}

/// Escape a property name for use as a JSON pointer token
fn pointer_token(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

fn optional_str<'a>(node: &'a Value, keyword: &str, pointer: &str, doc: &Document) -> Result<Option<&'a str>> {
    match node.get(keyword) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(doc.malformed(pointer, format!("`{}` must be a string", keyword))),
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds the class model from a loaded registry
pub struct ClassModelBuilder<'r> {
    registry: &'r mut SchemaRegistry,
    model: ClassModel,
    /// Ids currently under construction, outermost first (for cycle reports)
    in_progress: Vec<SchemaId>,
}

impl<'r> ClassModelBuilder<'r> {
    pub fn new(registry: &'r mut SchemaRegistry) -> Self {
        Self {
            registry,
            model: ClassModel::new(),
            in_progress: Vec::new(),
        }
    }

    /// Materialize every schema still unprocessed and return the model
    pub fn build_all(mut self) -> Result<ClassModel> {
        for id in self.registry.unprocessed() {
            self.build_class(&id)?;
        }
        Ok(self.model)
    }

    /// The model built so far
    pub fn model(&self) -> &ClassModel {
        &self.model
    }

    pub fn into_model(self) -> ClassModel {
        self.model
    }

    /// Materialize one schema, or return its class if already processed
    pub fn build_class(&mut self, id: &str) -> Result<ClassRef> {
        let schema = self.registry.get(id)?;
        match schema.state() {
            Materialization::Processed(class_ref) => return Ok(class_ref.clone()),
            Materialization::Building => {
                return Err(GenerateError::CyclicReference {
                    location: schema.location.display().to_string(),
                    pointer: String::new(),
                    chain: self.cycle_chain(id),
                })
            }
            Materialization::Unprocessed => {}
        }

        let doc = Document {
            identity: schema.identity.clone(),
            location: schema.location.clone(),
            root: Arc::clone(&schema.root),
        };

        self.registry.mark_building(id)?;
        self.in_progress.push(id.to_string());
        debug!(id = %id, "building class");

        let name = QualifiedName::top_level(doc.identity.namespace.clone(), doc.identity.type_name.clone());
        let mut class = ClassDefinition::new(name.clone());
        class.schema_id = Some(id.to_string());
        class.version = Some(doc.identity.version.clone());
        class.source = Some(doc.location.clone());

        let root = Arc::clone(&doc.root);
        self.populate(&mut class, &root, &doc, "")?;

        self.in_progress.pop();
        if let Some(existing) = self.model.find(&name.to_string()) {
            return Err(GenerateError::DuplicateMember {
                location: doc.location(),
                pointer: String::new(),
                name: format!(
                    "{} (already generated for {})",
                    name,
                    existing.schema_id.as_deref().unwrap_or_default()
                ),
            });
        }
        let class_ref = ClassRef {
            id: id.to_string(),
            name,
        };
        if self.model.insert(id.to_string(), class).is_some() {
            return Err(GenerateError::InvariantViolation {
                id: id.to_string(),
                reason: "a class for this identity already exists in the model".to_string(),
            });
        }
        self.registry.mark_processed(id, class_ref.clone())?;
        Ok(class_ref)
    }

    /// Walk `properties` into `class`, then apply `required`
    fn populate(&mut self, class: &mut ClassDefinition, node: &Value, doc: &Document, pointer: &str) -> Result<()> {
        if let Some(properties) = node.get("properties") {
            let properties_pointer = format!("{}/properties", pointer);
            let properties = properties
                .as_object()
                .ok_or_else(|| doc.malformed(&properties_pointer, "`properties` must be an object"))?;
            for (name, property) in properties {
                let property_pointer = format!("{}/{}", properties_pointer, pointer_token(name));
                self.build_field(class, name, property, doc, &property_pointer)?;
            }
        }
        apply_required(class, node, doc, pointer)
    }

    fn build_field(
        &mut self,
        parent: &mut ClassDefinition,
        name: &str,
        node: &Value,
        doc: &Document,
        pointer: &str,
    ) -> Result<()> {
        trace!(class = %parent.name, property = name, "building field");

        let ref_pointer = format!("{}/$ref", pointer);
        if let Some(reference) = optional_str(node, "$ref", &ref_pointer, doc)? {
            let target = self.resolve_reference(reference, doc, pointer)?;
            let class_ref = self.build_referenced(&target, doc, pointer)?;
            let field = FieldDefinition::new(name, SemanticType::Class(class_ref.name), BTreeSet::new());
            return add_field(parent, field, doc, pointer);
        }

        let json_type = optional_str(node, "type", &format!("{}/type", pointer), doc)?
            .ok_or_else(|| doc.malformed(pointer, "property declares neither `$ref` nor `type`"))?;
        let format = optional_str(node, "format", &format!("{}/format", pointer), doc)?;
        let keywords = Keywords::from_node(node);

        match map_type(json_type, format, &keywords).map_err(|e| doc.mapping_error(pointer, e))? {
            Mapping::Field {
                semantic_type,
                constraints,
            } => add_field(parent, FieldDefinition::new(name, semantic_type, constraints), doc, pointer),
            Mapping::Object => {
                let type_name = to_upper_camel_case(name);
                if type_name.is_empty() {
                    return Err(doc.malformed(pointer, format!("'{}' does not form a class name", name)));
                }
                if parent.nested_class(&type_name).is_some() {
                    return Err(GenerateError::DuplicateMember {
                        location: doc.location(),
                        pointer: pointer.to_string(),
                        name: type_name,
                    });
                }

                let nested_name = parent.name.nested(type_name);
                let mut nested = ClassDefinition::new(nested_name.clone());
                self.populate(&mut nested, node, doc, pointer)?;
                parent.nested_classes.push(nested);
                add_field(
                    parent,
                    FieldDefinition::new(name, SemanticType::Class(nested_name), BTreeSet::new()),
                    doc,
                    pointer,
                )
            }
        }
    }

    /// Resolve a `$ref` against the reference base of the document it appears in
    fn resolve_reference(&self, reference: &str, doc: &Document, pointer: &str) -> Result<SchemaId> {
        let unresolved = |resolved: String, suggestion: Option<SchemaId>| GenerateError::UnresolvedReference {
            location: doc.location(),
            pointer: pointer.to_string(),
            reference: reference.to_string(),
            resolved,
            suggestion,
        };

        let url = doc
            .identity
            .resolve_reference(reference)
            .map_err(|e| unresolved(format!("<invalid: {}>", e), None))?;
        if url.fragment().is_some_and(|fragment| !fragment.is_empty()) {
            return Err(unresolved(url.to_string(), None));
        }

        let id = canonical_id(&url);
        if !self.registry.contains(&id) {
            let suggestion = self.registry.suggest(&id);
            return Err(unresolved(id, suggestion));
        }
        Ok(id)
    }

    fn build_referenced(&mut self, target: &str, doc: &Document, pointer: &str) -> Result<ClassRef> {
        let building = self.registry.lookup(target).is_some_and(|schema| schema.is_building());
        if building {
            return Err(GenerateError::CyclicReference {
                location: doc.location(),
                pointer: pointer.to_string(),
                chain: self.cycle_chain(target),
            });
        }
        self.build_class(target)
    }

    /// The in-progress chain from `target` back around to `target`
    fn cycle_chain(&self, target: &str) -> Vec<SchemaId> {
        let start = self
            .in_progress
            .iter()
            .position(|id| id == target)
            .unwrap_or(0);
        let mut chain = self.in_progress[start..].to_vec();
        chain.push(target.to_string());
        chain
    }
}

fn add_field(class: &mut ClassDefinition, field: FieldDefinition, doc: &Document, pointer: &str) -> Result<()> {
    if field.name.is_empty() {
        return Err(doc.malformed(pointer, format!("'{}' does not form a field name", field.json_name)));
    }
    if class.field(&field.name).is_some() {
        return Err(GenerateError::DuplicateMember {
            location: doc.location(),
            pointer: pointer.to_string(),
            name: field.name,
        });
    }
    class.fields.push(field);
    Ok(())
}

/// Second pass: constrain every field named in `required`
fn apply_required(class: &mut ClassDefinition, node: &Value, doc: &Document, pointer: &str) -> Result<()> {
    let Some(required) = node.get("required") else {
        return Ok(());
    };
    let required_pointer = format!("{}/required", pointer);
    let names = required
        .as_array()
        .ok_or_else(|| doc.malformed(&required_pointer, "`required` must be an array"))?;

    for (index, entry) in names.iter().enumerate() {
        let entry_pointer = format!("{}/{}", required_pointer, index);
        let name = entry
            .as_str()
            .ok_or_else(|| doc.malformed(&entry_pointer, "`required` entries must be strings"))?;
        let field = class
            .field_mut(&to_lower_camel_case(name))
            .ok_or_else(|| GenerateError::MissingRequiredFieldDeclaration {
                location: doc.location(),
                pointer: entry_pointer.clone(),
                name: name.to_string(),
            })?;
        field.mark_required();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::Constraint;
    use crate::registry::SourceDocument;
    use serde_json::json;

    const PERSON: &str = "https://example.com/types/person/1.0";
    const ADDRESS: &str = "https://example.com/types/address/1.0";

    fn build(docs: Vec<Value>) -> Result<ClassModel> {
        let documents = docs
            .into_iter()
            .enumerate()
            .map(|(i, root)| SourceDocument::new(format!("doc{}.json", i), root));
        let mut registry = SchemaRegistry::load(documents)?;
        ClassModelBuilder::new(&mut registry).build_all()
    }

    fn person() -> Value {
        json!({
            "$id": PERSON,
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "minimum": 0}
            },
            "required": ["name"]
        })
    }

    #[test]
    fn test_single_schema() {
        let model = build(vec![person()]).unwrap();
        assert_eq!(model.len(), 1);

        let class = model.get(PERSON).unwrap();
        assert_eq!(class.name.to_string(), "com.example.types.Person");
        assert_eq!(class.version.as_deref(), Some("1.0"));

        let names: Vec<&str> = class.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age"]);

        let name = class.field("name").unwrap();
        assert_eq!(name.semantic_type, SemanticType::Text);
        assert!(name.required);
        assert!(name.has_constraint(Constraint::NonEmpty));

        let age = class.field("age").unwrap();
        assert_eq!(age.semantic_type, SemanticType::Integer);
        assert!(!age.required);
        assert_eq!(age.minimum(), Some(0));
        assert_eq!(age.maximum(), None);
    }

    #[test]
    fn test_reference_to_sibling() {
        let model = build(vec![
            json!({
                "$id": PERSON,
                "properties": {"address": {"$ref": "./address/1.0"}}
            }),
            json!({
                "$id": ADDRESS,
                "properties": {"street": {"type": "string"}}
            }),
        ])
        .unwrap();

        assert_eq!(model.len(), 2);
        let address_field = model.get(PERSON).unwrap().field("address").unwrap();
        assert_eq!(
            address_field.semantic_type.referenced_class().map(|n| n.to_string()),
            Some("com.example.types.Address".to_string())
        );
    }

    #[test]
    fn test_shared_target_is_built_once() {
        let model = build(vec![
            json!({"$id": PERSON, "properties": {
                "home": {"$ref": "./address/1.0"},
                "work": {"$ref": "/types/address/1.0"}
            }}),
            json!({"$id": "https://example.com/types/company/1.0", "properties": {
                "office": {"$ref": ADDRESS}
            }}),
            json!({"$id": ADDRESS, "properties": {"street": {"type": "string"}}}),
        ])
        .unwrap();

        assert_eq!(model.len(), 3);
        let addresses = model
            .classes()
            .filter(|c| c.name.simple_name() == "Address")
            .count();
        assert_eq!(addresses, 1);
    }

    #[test]
    fn test_nested_object_and_required() {
        let model = build(vec![json!({
            "$id": PERSON,
            "properties": {
                "postal-address": {
                    "type": "object",
                    "properties": {
                        "street": {"type": "string"},
                        "number": {"type": "integer"}
                    },
                    "required": ["street", "number"]
                }
            },
            "required": ["postal-address"]
        })])
        .unwrap();

        let class = model.get(PERSON).unwrap();
        let field = class.field("postalAddress").unwrap();
        assert_eq!(
            field.semantic_type.referenced_class().map(|n| n.to_string()),
            Some("com.example.types.Person.PostalAddress".to_string())
        );
        assert!(field.has_constraint(Constraint::NonNull));

        let nested = class.nested_class("PostalAddress").unwrap();
        assert!(nested.field("street").unwrap().has_constraint(Constraint::NonEmpty));
        assert!(nested.field("number").unwrap().has_constraint(Constraint::NonNull));
    }

    #[test]
    fn test_missing_required_declaration() {
        let err = build(vec![json!({
            "$id": PERSON,
            "properties": {"name": {"type": "string"}},
            "required": ["nickname"]
        })])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredFieldDeclaration);
        assert!(err.to_string().contains("/required/0"));
    }

    #[test]
    fn test_cycle_is_detected() {
        let err = build(vec![
            json!({"$id": "https://example.com/types/a/1", "properties": {"b": {"$ref": "./b/1"}}}),
            json!({"$id": "https://example.com/types/b/1", "properties": {"a": {"$ref": "./a/1"}}}),
        ])
        .unwrap_err();

        match err {
            GenerateError::CyclicReference { chain, .. } => {
                assert_eq!(
                    chain,
                    vec![
                        "https://example.com/types/a/1",
                        "https://example.com/types/b/1",
                        "https://example.com/types/a/1"
                    ]
                );
            }
            other => panic!("Expected CyclicReference, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let err = build(vec![json!({
            "$id": "https://example.com/types/node/1",
            "properties": {"next": {"$ref": "./node/1"}}
        })])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicReference);
    }

    #[test]
    fn test_unresolved_reference() {
        let err = build(vec![json!({
            "$id": PERSON,
            "properties": {"address": {"$ref": "./address/1.0"}}
        })])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
        assert!(err.to_string().contains("/properties/address"));
    }

    #[test]
    fn test_fragment_reference_is_unresolved() {
        let err = build(vec![
            json!({"$id": PERSON, "properties": {"a": {"$ref": "./address/1.0#/properties/street"}}}),
            json!({"$id": ADDRESS, "properties": {"street": {"type": "string"}}}),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    }

    #[test]
    fn test_unsupported_types_and_formats() {
        let err = build(vec![json!({"$id": PERSON, "properties": {"flag": {"type": "boolean"}}})])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);

        let err = build(vec![json!({"$id": PERSON, "properties": {
            "tags": {"type": "array", "items": {"type": "object"}}
        }})])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        assert!(err.to_string().contains("/properties/tags/items"));

        let err = build(vec![json!({"$id": PERSON, "properties": {
            "born": {"type": "string", "format": "date"}
        }})])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_duplicate_normalized_field() {
        let err = build(vec![json!({"$id": PERSON, "properties": {
            "first-name": {"type": "string"},
            "first_name": {"type": "string"}
        }})])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateMember);
    }

    #[test]
    fn test_malformed_schemas() {
        for root in [
            json!({"$id": PERSON, "properties": []}),
            json!({"$id": PERSON, "properties": {"x": {}}}),
            json!({"$id": PERSON, "properties": {"x": {"type": 7}}}),
            json!({"$id": PERSON, "properties": {"x": {"$ref": 7}}}),
            json!({"$id": PERSON, "properties": {"x": {"type": "integer", "minimum": "0"}}}),
            json!({"$id": PERSON, "properties": {"x": {"type": "array"}}}),
            json!({"$id": PERSON, "properties": {}, "required": "x"}),
        ] {
            let err = build(vec![root.clone()]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedSchema, "{} gave {:?}", root, err);
        }
    }

    #[test]
    fn test_versions_of_one_type_collide() {
        let err = build(vec![
            json!({"$id": PERSON, "properties": {}}),
            json!({"$id": "https://example.com/types/person/2.0", "properties": {}}),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateMember);
    }

    #[test]
    fn test_relative_reference_uses_own_document_base() {
        let model = build(vec![
            json!({"$id": "https://billing.example.org/billing/invoice/1", "properties": {
                "customer": {"$ref": "https://example.com/types/person/1.0"}
            }}),
            json!({"$id": PERSON, "properties": {"address": {"$ref": "./address/1.0"}}}),
            json!({"$id": ADDRESS, "properties": {}}),
        ])
        .unwrap();
        assert_eq!(model.len(), 3);
        assert!(model.find("org.example.billing.billing.Invoice").is_some());
        let address = model.get(PERSON).unwrap().field("address").unwrap();
        assert_eq!(
            address.semantic_type.referenced_class().map(|n| n.to_string()),
            Some("com.example.types.Address".to_string())
        );
    }

    #[test]
    fn test_number_with_fractional_bounds() {
        let model = build(vec![json!({"$id": PERSON, "properties": {
            "weight": {"type": "number", "minimum": 0.5, "maximum": 500.25}
        }})])
        .unwrap();
        let weight = model.get(PERSON).unwrap().field("weight").unwrap();
        assert_eq!(weight.semantic_type, SemanticType::Float);
        assert!(weight.constraints.is_empty());
    }

    #[test]
    fn test_schema_without_properties_is_an_empty_class() {
        let model = build(vec![json!({"$id": PERSON, "type": "object"})]).unwrap();
        assert!(model.get(PERSON).unwrap().fields.is_empty());
    }

    #[test]
    fn test_build_class_is_memoized() {
        let mut registry = SchemaRegistry::load(vec![SourceDocument::new("person.json", person())]).unwrap();
        let mut builder = ClassModelBuilder::new(&mut registry);
        let first = builder.build_class(PERSON).unwrap();
        let second = builder.build_class(PERSON).unwrap();
        assert_eq!(first, second);
        assert_eq!(builder.model().len(), 1);
        drop(builder);
        assert!(registry.get(PERSON).unwrap().is_processed());
    }
}
