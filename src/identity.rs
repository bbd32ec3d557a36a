//! Schema Identity
//!
//! Derives a structured identity from a schema's `$id`:
//!
//! ```text
//! https://example.com/types/person/1.0
//!         ^^^^^^^^^^^ ^^^^^ ^^^^^^ ^^^
//!         host        ns    type   version
//!
//! namespace = com.example.types   type = Person   version = 1.0
//! ```
//!
//! Host labels are reversed (DNS-reversed convention) and any path segments
//! before the type segment are appended to the namespace in order.

use thiserror::Error;
use url::{Host, Url};

use crate::naming::to_upper_camel_case;

/// Absolute identity locator, the registry key
pub type SchemaId = String;

/// Failure to derive an identity from a raw `$id`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("{reason}")]
    InvalidSchemaId { reason: String },

    #[error("{reason}")]
    MalformedIdentityPath { reason: String },
}

fn invalid(reason: impl Into<String>) -> IdentityError {
    IdentityError::InvalidSchemaId {
        reason: reason.into(),
    }
}

fn malformed(reason: impl Into<String>) -> IdentityError {
    IdentityError::MalformedIdentityPath {
        reason: reason.into(),
    }
}

/// Structured identity of one schema document. Immutable once derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The `$id` locator, fragment removed
    pub id: Url,
    /// Reversed host labels followed by the leading path segments
    pub namespace: Vec<String>,
    /// UpperCamelCase type name from the second-to-last path segment
    pub type_name: String,
    /// Last path segment, verbatim
    pub version: String,
    /// Scheme and host only
    pub base_locator: Url,
    /// Base locator plus the namespace path, with a trailing slash
    reference_base: Url,
}

impl Identity {
    /// Derive an identity from a raw `$id` string
    pub fn resolve(raw: &str) -> Result<Self, IdentityError> {
        let mut id = Url::parse(raw).map_err(|e| invalid(format!("not an absolute URI ({})", e)))?;
        id.set_fragment(None);

        let host = match id.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
                return Err(invalid("an IP-literal host cannot form a namespace"));
            }
            None => return Err(invalid("no host component")),
        };

        let labels: Vec<&str> = host.split('.').collect();
        if labels.iter().any(|label| label.is_empty()) {
            return Err(invalid(format!("host '{}' has an empty label", host)));
        }
        if labels.len() < 2 {
            return Err(invalid(format!("single-label host '{}'", host)));
        }

        let mut segments: Vec<String> = id
            .path_segments()
            .map(|split| {
                split
                    .filter(|segment| !segment.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let version = segments
            .pop()
            .ok_or_else(|| malformed("path has no version segment"))?;
        let type_segment = segments
            .pop()
            .ok_or_else(|| malformed("path has no type segment before the version"))?;
        let type_name = to_upper_camel_case(&type_segment);
        if type_name.is_empty() {
            return Err(malformed(format!(
                "type segment '{}' contains no word characters",
                type_segment
            )));
        }

        let mut base_locator = id.clone();
        base_locator.set_path("/");
        base_locator.set_query(None);

        let mut reference_base = base_locator.clone();
        let collection: String = segments.iter().map(|s| format!("{}/", s)).collect();
        reference_base.set_path(&format!("/{}", collection));

        let mut namespace: Vec<String> = labels.iter().rev().map(|s| s.to_string()).collect();
        namespace.extend(segments);

        Ok(Self {
            id,
            namespace,
            type_name,
            version,
            base_locator,
            reference_base,
        })
    }

    /// Registry key for this identity
    pub fn key(&self) -> SchemaId {
        self.id.as_str().to_string()
    }

    /// Dot-joined namespace (e.g. `com.example.types`)
    pub fn namespace_path(&self) -> String {
        self.namespace.join(".")
    }

    /// Fully qualified class name (e.g. `com.example.types.Person`)
    pub fn qualified_class_name(&self) -> String {
        format!("{}.{}", self.namespace_path(), self.type_name)
    }

    /// The URL relative `$ref`s in this document are joined against
    pub fn reference_base(&self) -> &Url {
        &self.reference_base
    }

    /// Resolve a `$ref` found inside this document to an absolute locator.
    ///
    /// Absolute references pass through; root-relative ones land on the base
    /// locator; others resolve against the document's namespace collection.
    pub fn resolve_reference(&self, reference: &str) -> Result<Url, url::ParseError> {
        self.reference_base.join(reference)
    }
}

/// Registry key for an arbitrary resolved locator
pub fn canonical_id(url: &Url) -> SchemaId {
    let mut url = url.clone();
    url.set_fragment(None);
    url.as_str().to_string()
}
