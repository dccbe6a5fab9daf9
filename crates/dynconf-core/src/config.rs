//! Reconciler configuration

use std::fs;
use std::path::{Path, PathBuf};

use dynconf_diff::DiffOptions;
use serde::{Deserialize, Serialize};

/// Reconciler configuration
///
/// Loaded from TOML; every field is optional.
///
/// ```toml
/// schema_dir = "/etc/dynconf/schemas"
/// validate_desired = true
/// skip_node_specific = true
/// log_filter = "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcilerConfig {
    /// Directory of `<version>.json` schema files
    pub schema_dir: Option<PathBuf>,
    /// Validate the desired tree against its schema before diffing
    pub validate_desired: bool,
    /// Leave node-identifying fields and log sinks out of the diff
    pub skip_node_specific: bool,
    /// Default tracing filter for the binary
    pub log_filter: String,
}

impl ReconcilerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With schema directory
    #[inline]
    #[must_use]
    pub fn with_schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = Some(dir.into());
        self
    }

    /// With desired-tree validation on or off
    #[inline]
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_desired = validate;
        self
    }

    /// With node-specific skipping on or off
    #[inline]
    #[must_use]
    pub fn with_skip_node_specific(mut self, skip: bool) -> Self {
        self.skip_node_specific = skip;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error on malformed TOML or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded reconciler configuration");
        Ok(config)
    }

    /// Diff options implied by this configuration
    #[inline]
    #[must_use]
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            skip_node_specific: self.skip_node_specific,
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            schema_dir: None,
            validate_desired: true,
            skip_node_specific: true,
            log_filter: "info".to_string(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File cannot be read
    #[error("cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML or unknown key
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ReconcilerConfig::from_toml_str("").unwrap(), ReconcilerConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = ReconcilerConfig::from_toml_str(
            "schema_dir = \"/etc/dynconf/schemas\"\nvalidate_desired = false\n",
        )
        .unwrap();
        assert_eq!(config.schema_dir, Some(PathBuf::from("/etc/dynconf/schemas")));
        assert!(!config.validate_desired);
        assert!(config.skip_node_specific);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(matches!(
            ReconcilerConfig::from_toml_str("retries = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn builder_and_diff_options() {
        let config = ReconcilerConfig::new().with_skip_node_specific(false);
        assert!(!config.diff_options().skip_node_specific);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ReconcilerConfig::from_file("/nonexistent/dynconf.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
