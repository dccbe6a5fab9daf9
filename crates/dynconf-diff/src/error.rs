//! Error types for diffing and classification

use dynconf_schema::SchemaError;

/// Errors from the diff engine and the dynamic-safety classifier
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Schema lookup failed (invalid or unsupported version)
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl DiffError {
    /// Check for the version errors that abort reconciliation
    #[inline]
    #[must_use]
    pub fn is_version_error(&self) -> bool {
        match self {
            Self::Schema(e) => e.is_version_error(),
        }
    }
}
