//! Rust Code Emitter
//!
//! Generates one Rust module per top-level class.
//!
//! Layout under the destination:
//! - namespace segments become directories, each with a `mod.rs`
//! - each top-level class becomes `<type_module>.rs` holding its struct and
//!   the structs of its nested classes (named by concatenating the path,
//!   e.g. `PersonAddress`)
//!
//! Key constraints:
//! - This module ONLY reads the class model - no raw JSON
//! - Requiredness is expressed by the type: optional fields are `Option<T>`,
//!   lists are always `Vec<T>` defaulting to empty

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::{write_file, EmitReport, Emitter};
use crate::error::{GenerateError, Result};
use crate::model::{ClassDefinition, ClassModel, Constraint, FieldDefinition, QualifiedName, SemanticType};

const GENERATED_MARKER: &str = "// @generated by classgen. Do not edit.";

// =============================================================================
// Emitter
// =============================================================================

/// Emits serde/validator-annotated Rust structs
#[derive(Debug, Clone)]
pub struct RustEmitter {
    generated_at: DateTime<Utc>,
}

impl RustEmitter {
    pub fn new() -> Self {
        Self::with_timestamp(Utc::now())
    }

    /// Use a fixed generation timestamp in file headers
    pub fn with_timestamp(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }
}

impl Default for RustEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for RustEmitter {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn emit(&self, model: &ClassModel, destination: &Path) -> Result<EmitReport> {
        // Plan every file before writing any, so a layout conflict leaves the
        // destination untouched
        let plan = plan_layout(model, destination)?;

        let mut report = EmitReport::default();
        for (file, class) in &plan.classes {
            write_file(file, &self.render_class_file(class))?;
            debug!(class = %class.name, file = %file.display(), "emitted rust module");
            report.files.push(file.clone());
        }
        for (dir, children) in &plan.modules {
            let path = dir.join("mod.rs");
            write_file(&path, &render_mod_file(children))?;
            report.files.push(path);
        }

        Ok(report)
    }
}

// =============================================================================
// Layout Planning
// =============================================================================

/// Where every class file and `mod.rs` goes
struct Layout<'m> {
    /// Class files in emission order
    classes: Vec<(PathBuf, &'m ClassDefinition)>,
    /// Directory -> child modules declared by its `mod.rs`
    modules: BTreeMap<PathBuf, BTreeSet<String>>,
}

fn layout_conflict(file: &Path, name: String) -> GenerateError {
    GenerateError::DuplicateMember {
        location: file.display().to_string(),
        pointer: String::new(),
        name,
    }
}

fn plan_layout<'m>(model: &'m ClassModel, destination: &Path) -> Result<Layout<'m>> {
    let mut classes = Vec::with_capacity(model.len());
    let mut modules: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();
    let mut files: BTreeMap<PathBuf, &str> = BTreeMap::new();

    for id in model.emission_order() {
        let Some(class) = model.get(id) else {
            continue;
        };

        let module_path = class_module_path(&class.name);
        let file = module_file(destination, &module_path);
        if let Some(previous) = files.insert(file.clone(), id.as_str()) {
            return Err(layout_conflict(
                &file,
                format!("{} (also generated for {})", class.name, previous),
            ));
        }
        check_struct_names(class, &file)?;

        // Register every directory level with its parent's mod.rs
        let mut dir = destination.to_path_buf();
        for segment in &module_path {
            modules.entry(dir.clone()).or_default().insert(segment.clone());
            dir.push(segment);
        }
        classes.push((file, class));
    }

    // `x.rs` next to a namespace directory `x/` declares the module twice
    for dir in modules.keys() {
        let mut as_file = dir.clone();
        as_file.set_extension("rs");
        if let Some(id) = files.get(&as_file) {
            return Err(layout_conflict(
                &as_file,
                format!("{} (module is also a namespace directory)", id),
            ));
        }
    }

    Ok(Layout { classes, modules })
}

/// Nested struct names are concatenated paths and must stay unique per file
fn check_struct_names(class: &ClassDefinition, file: &Path) -> Result<()> {
    fn collect<'c>(
        class: &'c ClassDefinition,
        seen: &mut BTreeMap<String, &'c QualifiedName>,
        file: &Path,
    ) -> Result<()> {
        let name = struct_name(&class.name);
        if let Some(previous) = seen.insert(name.clone(), &class.name) {
            return Err(layout_conflict(
                file,
                format!("{} (struct {} also generated for {})", class.name, name, previous),
            ));
        }
        for nested in &class.nested_classes {
            collect(nested, seen, file)?;
        }
        Ok(())
    }
    collect(class, &mut BTreeMap::new(), file)
}

// =============================================================================
// File Rendering
// =============================================================================

impl RustEmitter {
    fn render_class_file(&self, class: &ClassDefinition) -> String {
        let mut output = String::new();
        output.push_str(GENERATED_MARKER);
        output.push('\n');
        if let Some(id) = &class.schema_id {
            output.push_str(&format!("// Schema: {}\n", id));
        }
        if let Some(version) = &class.version {
            output.push_str(&format!("// Version: {}\n", version));
        }
        output.push_str(&format!(
            "// Generated: {}\n\n",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        output.push_str("use serde::{Deserialize, Serialize};\n");
        output.push_str("use validator::Validate;\n");

        let current = class_module_path(&class.name);
        emit_struct(&mut output, class, &current);
        output
    }
}

fn render_mod_file(children: &BTreeSet<String>) -> String {
    let mut output = String::new();
    output.push_str(GENERATED_MARKER);
    output.push_str("\n\n");
    for child in children {
        output.push_str(&format!("pub mod {};\n", child));
    }
    output
}

// =============================================================================
// Struct Emission
// =============================================================================

fn emit_struct(output: &mut String, class: &ClassDefinition, current: &[String]) {
    output.push('\n');
    output.push_str(&format!("/// {}\n", class.name));
    output.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]\n");
    output.push_str(&format!("pub struct {} {{\n", struct_name(&class.name)));
    for field in &class.fields {
        emit_field(output, field, current);
    }
    output.push_str("}\n");

    for nested in &class.nested_classes {
        emit_struct(output, nested, current);
    }
}

fn emit_field(output: &mut String, field: &FieldDefinition, current: &[String]) {
    let ident = escape_keyword(&sanitize_identifier(&to_snake_case(&field.name)));
    let optional = !field.required && !field.defaults_to_empty();

    let mut serde_args = Vec::new();
    if ident.trim_start_matches("r#") != field.json_name {
        serde_args.push(format!("rename = \"{}\"", field.json_name.escape_default()));
    }
    if field.defaults_to_empty() {
        serde_args.push("default".to_string());
    } else if optional {
        serde_args.push("default".to_string());
        serde_args.push("skip_serializing_if = \"Option::is_none\"".to_string());
    }
    if field.has_constraint(Constraint::StringEncoded) {
        let with = if optional {
            "rust_decimal::serde::str_option"
        } else {
            "rust_decimal::serde::str"
        };
        serde_args.push(format!("with = \"{}\"", with));
    }
    if !serde_args.is_empty() {
        output.push_str(&format!("    #[serde({})]\n", serde_args.join(", ")));
    }

    for rule in validation_rules(field) {
        output.push_str(&format!("    #[validate({})]\n", rule));
    }

    let rust_type = render_type(&field.semantic_type, current);
    let full_type = if optional {
        format!("Option<{}>", rust_type)
    } else {
        rust_type
    };
    output.push_str(&format!("    pub {}: {},\n", ident, full_type));
}

fn validation_rules(field: &FieldDefinition) -> Vec<String> {
    let mut rules = Vec::new();
    if field.has_constraint(Constraint::NonEmpty) {
        rules.push("length(min = 1)".to_string());
    }
    let bounds: Vec<String> = field
        .minimum()
        .map(|min| format!("min = {}", min))
        .into_iter()
        .chain(field.maximum().map(|max| format!("max = {}", max)))
        .collect();
    if !bounds.is_empty() {
        rules.push(format!("range({})", bounds.join(", ")));
    }
    if field.semantic_type.referenced_class().is_some() {
        rules.push("nested".to_string());
    }
    rules
}

fn render_type(semantic_type: &SemanticType, current: &[String]) -> String {
    match semantic_type {
        SemanticType::Text => "String".to_string(),
        SemanticType::Decimal => "rust_decimal::Decimal".to_string(),
        SemanticType::Integer => "i64".to_string(),
        SemanticType::Float => "f64".to_string(),
        SemanticType::List(inner) => format!("Vec<{}>", render_type(inner, current)),
        SemanticType::Class(name) => class_path(name, current),
    }
}

// =============================================================================
// Paths and Names
// =============================================================================

/// Module path of the file holding a class: namespace segments, then the
/// module of the outermost type
fn class_module_path(name: &QualifiedName) -> Vec<String> {
    let mut path: Vec<String> = name
        .namespace
        .iter()
        .map(|segment| module_name(segment))
        .collect();
    if let Some(outer) = name.path.first() {
        path.push(module_name(outer));
    }
    path
}

fn module_file(destination: &Path, module_path: &[String]) -> PathBuf {
    let mut file = destination.to_path_buf();
    for segment in module_path {
        file.push(segment);
    }
    file.set_extension("rs");
    file
}

/// Path to a class as seen from the module `current`
fn class_path(name: &QualifiedName, current: &[String]) -> String {
    let target = class_module_path(name);
    if target == current {
        return struct_name(name);
    }
    let common = target
        .iter()
        .zip(current)
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<String> = vec!["super".to_string(); current.len() - common];
    parts.extend(target[common..].iter().cloned());
    parts.push(struct_name(name));
    parts.join("::")
}

/// Struct identifier: the class path concatenated (`Person`, `PersonAddress`)
fn struct_name(name: &QualifiedName) -> String {
    let joined: String = name.path.iter().map(|part| sanitize_identifier(part)).collect();
    escape_keyword(&joined)
}

/// Module identifier; doubles as a file name, so keywords get a trailing `_`
/// instead of the raw prefix
fn module_name(segment: &str) -> String {
    let name = sanitize_identifier(&to_snake_case(segment));
    if RUST_KEYWORDS.contains(&name.as_str()) || NON_RAW_KEYWORDS.contains(&name.as_str()) {
        format!("{}_", name)
    } else {
        name
    }
}

/// Replace characters that cannot appear in an identifier
fn sanitize_identifier(s: &str) -> String {
    let mut result: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if result.is_empty() || result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// Convert to snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' || c == ' ' {
            result.push('_');
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }

    result
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while",
    "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Keywords that cannot be raw identifiers
const NON_RAW_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

/// Escape a keyword if needed
fn escape_keyword(name: &str) -> String {
    if NON_RAW_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}
