//! Source Discovery
//!
//! Walks a source tree and parses every `.json` file into a
//! [`SourceDocument`]. Files are returned sorted by path so registry loading
//! sees the same sequence on every run.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{GenerateError, Result};
use crate::registry::SourceDocument;

/// Discover and parse all schema documents under `source`
pub fn discover(source: &Path) -> Result<Vec<SourceDocument>> {
    if !source.is_dir() {
        return Err(GenerateError::io(
            source,
            io::Error::new(io::ErrorKind::NotFound, "source directory does not exist"),
        ));
    }

    let mut documents = Vec::new();
    let walker = WalkDir::new(source).sort_by_file_name().into_iter();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory walk failed"));
            GenerateError::io(path, source)
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().map(|ext| ext != "json").unwrap_or(true) {
            trace!(path = %path.display(), "skipping non-json file");
            continue;
        }

        documents.push(read_document(path)?);
    }

    debug!(source = %source.display(), count = documents.len(), "discovered schema documents");
    Ok(documents)
}

/// Read and parse a single schema document
pub fn read_document(path: &Path) -> Result<SourceDocument> {
    let content = fs::read_to_string(path).map_err(|e| GenerateError::io(path, e))?;
    let root = serde_json::from_str(&content).map_err(|e| GenerateError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(SourceDocument::new(path, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_sorted_json_only() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b.json", r#"{"$id": "https://example.com/t/b/1"}"#);
        write(temp.path(), "a.json", r#"{"$id": "https://example.com/t/a/1"}"#);
        write(temp.path(), "nested/c.json", r#"{"$id": "https://example.com/t/c/1"}"#);
        write(temp.path(), "README.md", "# not a schema");

        let documents = discover(temp.path()).unwrap();
        let names: Vec<String> = documents
            .iter()
            .map(|d| d.location.strip_prefix(temp.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "nested/c.json"]);
    }

    #[test]
    fn test_every_directory_is_walked() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "p.json", r#"{"$id": "https://example.com/types/p/1"}"#);
        write(temp.path(), "target/t.json", r#"{"$id": "https://example.com/types/target/1"}"#);
        write(temp.path(), "node_modules/n.json", r#"{"$id": "https://example.com/types/n/1"}"#);

        let documents = discover(temp.path()).unwrap();
        let ids: Vec<&str> = documents.iter().map(|d| d.root["$id"].as_str().unwrap()).collect();
        assert_eq!(
            ids,
            vec![
                "https://example.com/types/n/1",
                "https://example.com/types/p/1",
                "https://example.com/types/target/1"
            ]
        );
    }

    #[test]
    fn test_parse_failure_names_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "broken.json", "{ not json");

        let err = discover(temp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Json);
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_missing_source_directory() {
        let temp = TempDir::new().unwrap();
        let err = discover(&temp.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
