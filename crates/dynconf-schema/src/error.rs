//! Error types for the schema registry

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// One field-level schema violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Violated keyword (`Type`, `Required`, `Enum`, ...)
    pub kind: String,
    /// JSON pointer of the offending value
    pub path: String,
    /// Human-readable description
    pub description: String,
    /// Offending value
    pub value: JsonValue,
}

/// Errors from schema loading and lookups
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Version string has no `major.minor.patch` prefix
    #[error("invalid server version: '{0}'")]
    VersionInvalid(String),

    /// No schema registered for the base version
    #[error("unsupported server version: {0}")]
    VersionUnsupported(String),

    /// Two schema documents for one base version
    #[error("schema for version {0} registered twice")]
    DuplicateVersion(String),

    /// Configuration does not satisfy the schema
    #[error("schema validation failed with {} issue(s): {}", .0.len(), summarize(.0))]
    Validation(Vec<ValidationIssue>),

    /// Schema document cannot be compiled into a validator
    #[error("schema for version {version} is not a valid JSON schema: {message}")]
    InvalidSchema { version: String, message: String },

    /// IO error while reading a schema source
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Schema document is not valid JSON
    #[error("schema {name} is not valid JSON: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SchemaError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check for the version errors that abort any dependent operation
    #[inline]
    #[must_use]
    pub fn is_version_error(&self) -> bool {
        matches!(self, Self::VersionInvalid(_) | Self::VersionUnsupported(_))
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{} at '{}'", i.kind, i.path))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_error_display() {
        let err = SchemaError::VersionUnsupported("4.0.0".to_string());
        assert_eq!(err.to_string(), "unsupported server version: 4.0.0");
        assert!(err.is_version_error());
    }

    #[test]
    fn validation_display_lists_paths() {
        let err = SchemaError::Validation(vec![ValidationIssue {
            kind: "Type".to_string(),
            path: "/service/proto-fd-max".to_string(),
            description: "\"x\" is not of type \"integer\"".to_string(),
            value: JsonValue::String("x".to_string()),
        }]);
        let text = err.to_string();
        assert!(text.contains("1 issue(s)"));
        assert!(text.contains("/service/proto-fd-max"));
        assert!(!err.is_version_error());
    }
}
