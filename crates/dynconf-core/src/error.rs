//! Error types for the reconciler

use dynconf_compile::CompileError;
use dynconf_diff::DiffError;
use dynconf_model::ModelError;
use dynconf_schema::SchemaError;

use crate::config::ConfigError;

/// Reconciler error type
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No schema directory configured
    #[error("no schema directory configured")]
    MissingSchemaDir,

    /// Input tree could not be decoded
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Schema lookup, load or validation failed
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Diff or classification failed
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    /// Command compilation failed
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

impl ReconcileError {
    /// Check for the version errors that abort reconciliation
    #[must_use]
    pub fn is_version_error(&self) -> bool {
        match self {
            Self::Schema(e) => e.is_version_error(),
            Self::Diff(e) => e.is_version_error(),
            _ => false,
        }
    }
}
