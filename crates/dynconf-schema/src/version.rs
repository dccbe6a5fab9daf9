//! Server version handling

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SchemaError;

static BASE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)").expect("version pattern is valid"));

/// Extract `major.minor.patch` from a build version string
///
/// `7.0.0.5-1` → `7.0.0`. Build strings that do not start with three
/// numeric components are rejected rather than truncated.
///
/// # Errors
/// Returns [`SchemaError::VersionInvalid`] if the string has no
/// `major.minor.patch` prefix
pub fn base_version(version: &str) -> Result<String, SchemaError> {
    let caps = BASE_VERSION
        .captures(version.trim())
        .ok_or_else(|| SchemaError::VersionInvalid(version.to_string()))?;
    Ok(format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]))
}
