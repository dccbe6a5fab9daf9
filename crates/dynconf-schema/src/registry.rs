//! Schema registry
//!
//! Provides [`SchemaRegistry`], the per-version catalog consulted by the
//! diff engine (default fill) and the dynamic-safety classifier.
//!
//! The registry is built once from a [`SchemaSource`] and is immutable
//! afterwards; share it by reference or `Arc`.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::OnceLock;

use dynconf_model::{ConfigTree, ConfigValue, Scalar};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value as JsonValue;

use crate::error::{SchemaError, ValidationIssue};
use crate::flatten::{flatten_schema, logical_key, split_keyword};
use crate::source::SchemaSource;
use crate::version::base_version;

/// Catalog derived from one schema document
pub struct SchemaEntry {
    version: String,
    document: JsonValue,
    defaults: BTreeMap<String, ConfigValue>,
    dynamic: BTreeSet<String>,
    required: BTreeMap<String, Vec<Vec<String>>>,
    validator: OnceLock<Result<JSONSchema, String>>,
}

impl SchemaEntry {
    /// Derive the catalog from a schema document
    #[must_use]
    pub fn from_document(version: impl Into<String>, document: JsonValue) -> Self {
        let mut defaults = BTreeMap::new();
        let mut ambiguous = HashSet::new();
        let mut dynamic = BTreeSet::new();
        let mut required: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();

        for (path, value) in flatten_schema(&document) {
            let (head, keyword) = split_keyword(&path);
            match keyword {
                "default" => {
                    let key = logical_key(head);
                    if ambiguous.contains(&key) {
                        continue;
                    }
                    let Some(value) = default_value(&value) else {
                        continue;
                    };
                    match defaults.get(&key) {
                        None => {
                            defaults.insert(key, value);
                        }
                        Some(existing) if *existing == value => {}
                        Some(_) => {
                            tracing::debug!(%key, "conflicting defaults across schema branches, dropping");
                            defaults.remove(&key);
                            ambiguous.insert(key);
                        }
                    }
                }
                "dynamic" if value == JsonValue::Bool(true) => {
                    dynamic.insert(logical_key(head));
                }
                "required" => {
                    if let Some(fields) = value.as_array() {
                        let fields = fields
                            .iter()
                            .filter_map(JsonValue::as_str)
                            .map(str::to_string)
                            .collect();
                        required.entry(logical_key(head)).or_default().push(fields);
                    }
                }
                _ => {}
            }
        }

        Self {
            version: version.into(),
            document,
            defaults,
            dynamic,
            required,
            validator: OnceLock::new(),
        }
    }

    /// Base version this entry describes
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Raw schema document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &JsonValue {
        &self.document
    }

    /// Logical key → unambiguous literal default
    #[inline]
    #[must_use]
    pub fn defaults(&self) -> &BTreeMap<String, ConfigValue> {
        &self.defaults
    }

    /// Logical keys changeable without restart
    #[inline]
    #[must_use]
    pub fn dynamic_fields(&self) -> &BTreeSet<String> {
        &self.dynamic
    }

    /// Context → alternative required-field sets
    #[inline]
    #[must_use]
    pub fn required(&self) -> &BTreeMap<String, Vec<Vec<String>>> {
        &self.required
    }

    fn validator(&self) -> Result<&JSONSchema, SchemaError> {
        self.validator
            .get_or_init(|| {
                JSONSchema::options()
                    .with_draft(Draft::Draft7)
                    .compile(&self.document)
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|message| SchemaError::InvalidSchema {
                version: self.version.clone(),
                message: message.clone(),
            })
    }
}

impl fmt::Debug for SchemaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEntry")
            .field("version", &self.version)
            .field("defaults", &self.defaults.len())
            .field("dynamic", &self.dynamic.len())
            .field("required", &self.required.len())
            .finish_non_exhaustive()
    }
}

fn default_value(value: &JsonValue) -> Option<ConfigValue> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(ConfigValue::from(*b)),
        JsonValue::Number(n) => Some(ConfigValue::Scalar(Scalar::from_number(n))),
        JsonValue::String(s) => Some(ConfigValue::from(s.as_str())),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(Scalar::from_number(n).to_string()),
                JsonValue::Bool(b) => Some(b.to_string()),
                JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(ConfigValue::StringList),
        JsonValue::Object(_) => ConfigTree::from_json(value.clone()).ok().map(ConfigValue::Nested),
    }
}

/// Per-version schema catalog
///
/// Keyed by base version (`major.minor.patch`). Every lookup accepts a full
/// build version and resolves its base first.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: BTreeMap<String, SchemaEntry>,
}

impl SchemaRegistry {
    /// Build registry from a schema source
    ///
    /// # Errors
    /// Returns error if the source cannot be read, a document is not JSON,
    /// a document is named by an invalid version, or a base version repeats
    pub fn from_source(source: &dyn SchemaSource) -> Result<Self, SchemaError> {
        Self::from_documents(source.documents()?)
    }

    /// Build registry from `(version, document)` pairs
    ///
    /// # Errors
    /// Returns error on an invalid or repeated base version
    pub fn from_documents(
        documents: impl IntoIterator<Item = (String, JsonValue)>,
    ) -> Result<Self, SchemaError> {
        let mut entries = BTreeMap::new();
        for (version, document) in documents {
            let base = base_version(&version)?;
            if entries.contains_key(&base) {
                return Err(SchemaError::DuplicateVersion(base));
            }
            let entry = SchemaEntry::from_document(base.clone(), document);
            tracing::info!(version = %base, "registered configuration schema");
            tracing::debug!(
                version = %base,
                defaults = entry.defaults.len(),
                dynamic = entry.dynamic.len(),
                required = entry.required.len(),
                "schema catalog derived"
            );
            entries.insert(base, entry);
        }
        Ok(Self { entries })
    }

    /// Registered base versions, ascending
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered versions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if registry has no versions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a build version
    ///
    /// # Errors
    /// Returns [`SchemaError::VersionInvalid`] or
    /// [`SchemaError::VersionUnsupported`]
    pub fn entry(&self, version: &str) -> Result<&SchemaEntry, SchemaError> {
        let base = base_version(version)?;
        self.entries
            .get(&base)
            .ok_or(SchemaError::VersionUnsupported(base))
    }

    /// Defaults for a build version
    ///
    /// # Errors
    /// Returns error if the version is invalid or unregistered
    pub fn defaults(&self, version: &str) -> Result<&BTreeMap<String, ConfigValue>, SchemaError> {
        self.entry(version).map(SchemaEntry::defaults)
    }

    /// Dynamic fields for a build version
    ///
    /// # Errors
    /// Returns error if the version is invalid or unregistered
    pub fn dynamic_fields(&self, version: &str) -> Result<&BTreeSet<String>, SchemaError> {
        self.entry(version).map(SchemaEntry::dynamic_fields)
    }

    /// Required-field sets for a build version
    ///
    /// # Errors
    /// Returns error if the version is invalid or unregistered
    pub fn required(
        &self,
        version: &str,
    ) -> Result<&BTreeMap<String, Vec<Vec<String>>>, SchemaError> {
        self.entry(version).map(SchemaEntry::required)
    }

    /// Required fields still missing from a context
    ///
    /// A context is complete when any one of its required sets is fully
    /// present. Returns `None` when complete (or unconstrained), otherwise
    /// the missing fields of the closest set.
    ///
    /// # Errors
    /// Returns error if the version is invalid or unregistered
    pub fn missing_required(
        &self,
        version: &str,
        context: &str,
        present: &BTreeSet<&str>,
    ) -> Result<Option<Vec<String>>, SchemaError> {
        let Some(sets) = self.required(version)?.get(context) else {
            return Ok(None);
        };

        let mut best: Option<Vec<String>> = None;
        for set in sets {
            let missing: Vec<String> = set
                .iter()
                .filter(|f| !present.contains(f.as_str()))
                .cloned()
                .collect();
            if missing.is_empty() {
                return Ok(None);
            }
            if best.as_ref().map_or(true, |b| missing.len() < b.len()) {
                best = Some(missing);
            }
        }
        Ok(best)
    }

    /// Validate an expanded configuration tree against its version's schema
    ///
    /// # Errors
    /// Returns [`SchemaError::Validation`] listing every violation, or a
    /// version / schema compilation error
    pub fn validate(&self, version: &str, tree: &ConfigTree) -> Result<(), SchemaError> {
        let entry = self.entry(version)?;
        let validator = entry.validator()?;
        let instance = tree.to_json();

        let issues: Vec<ValidationIssue> = match validator.validate(&instance) {
            Ok(()) => return Ok(()),
            Err(errors) => errors
                .map(|e| ValidationIssue {
                    kind: kind_name(&format!("{:?}", e.kind)),
                    path: e.instance_path.to_string(),
                    description: e.to_string(),
                    value: e.instance.clone().into_owned(),
                })
                .collect(),
        };

        tracing::debug!(version = entry.version(), issues = issues.len(), "configuration failed validation");
        Err(SchemaError::Validation(issues))
    }
}

/// Variant name from a `Debug` rendering (`Type { kind: .. }` → `Type`)
fn kind_name(debug: &str) -> String {
    debug
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or_default()
        .to_string()
}
