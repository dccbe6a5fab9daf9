//! Schema document sources

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::error::SchemaError;

/// Supplies `(version, document)` pairs to the registry
pub trait SchemaSource {
    /// Load every schema document
    ///
    /// # Errors
    /// Returns error if a document cannot be read or parsed
    fn documents(&self) -> Result<Vec<(String, JsonValue)>, SchemaError>;
}

/// Directory of `<version>.json` files
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Create source over a directory
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory being read
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SchemaSource for DirSource {
    fn documents(&self) -> Result<Vec<(String, JsonValue)>, SchemaError> {
        let entries = fs::read_dir(&self.root).map_err(|e| SchemaError::io_error(&self.root, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SchemaError::io_error(&self.root, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping schema file with non UTF-8 name");
                continue;
            };
            let name = stem.to_string();
            let text = fs::read_to_string(&path).map_err(|e| SchemaError::io_error(&path, e))?;
            let document = serde_json::from_str(&text)
                .map_err(|source| SchemaError::Parse { name: name.clone(), source })?;
            tracing::debug!(path = %path.display(), "loaded schema document");
            documents.push((name, document));
        }
        Ok(documents)
    }
}

/// In-memory schema documents
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: Vec<(String, JsonValue)>,
}

impl MemorySource {
    /// Create empty source
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document for a version
    #[must_use]
    pub fn with(mut self, version: impl Into<String>, document: JsonValue) -> Self {
        self.documents.push((version.into(), document));
        self
    }

    /// Add a document given as JSON text
    ///
    /// # Errors
    /// Returns [`SchemaError::Parse`] if the text is not JSON
    pub fn with_text(self, version: impl Into<String>, text: &str) -> Result<Self, SchemaError> {
        let version = version.into();
        let document = serde_json::from_str(text).map_err(|source| SchemaError::Parse {
            name: version.clone(),
            source,
        })?;
        Ok(self.with(version, document))
    }
}

impl SchemaSource for MemorySource {
    fn documents(&self) -> Result<Vec<(String, JsonValue)>, SchemaError> {
        Ok(self.documents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_source_keeps_order() {
        let source = MemorySource::new()
            .with("7.0.0", json!({}))
            .with("6.4.0", json!({"type": "object"}));
        let docs = source.documents().unwrap();
        assert_eq!(docs[0].0, "7.0.0");
        assert_eq!(docs[1].1, json!({"type": "object"}));
    }

    #[test]
    fn memory_source_rejects_bad_text() {
        let err = MemorySource::new().with_text("7.0.0", "{not json").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { name, .. } if name == "7.0.0"));
    }
}
