//! Configuration values and trees
//!
//! Provides [`ConfigTree`], the nested configuration document, and the closed
//! value union [`ConfigValue`] every transform in the workspace matches on.

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as JsonValue};

use crate::vocab;

/// Leaf value of a configuration tree
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// String value
    Str(String),
    /// Boolean value
    Bool(bool),
    /// Negative (or explicitly signed) integer
    Int(i64),
    /// Non-negative integer, wide enough for 2^64-1 sentinels
    Uint(u64),
    /// Floating point value
    Float(f64),
}

impl Scalar {
    /// Decode a JSON number
    ///
    /// Non-negative integers become [`Scalar::Uint`], negative integers
    /// [`Scalar::Int`], everything else [`Scalar::Float`].
    #[must_use]
    pub fn from_number(n: &Number) -> Self {
        if let Some(u) = n.as_u64() {
            Self::Uint(u)
        } else if let Some(i) = n.as_i64() {
            Self::Int(i)
        } else {
            Self::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }

    /// Borrow as string if this is a string scalar
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used for cross-kind comparison
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Uint(u) => Some(*u as f64),
            Self::Float(f) => Some(*f),
            Self::Str(_) | Self::Bool(_) => None,
        }
    }

    /// Short name of the scalar kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Self::Str(s) => JsonValue::String(s.clone()),
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::Uint(u) => JsonValue::from(*u),
            Self::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Uint(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Any value a configuration field can hold
///
/// Closed union: flatten, diff and compile all switch exhaustively on it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Single leaf value
    Scalar(Scalar),
    /// List of strings (addresses, devices, ignore-lists, ...)
    StringList(Vec<String>),
    /// Nested section
    Nested(ConfigTree),
    /// Repeated named section (namespaces, DCs, sets, log sinks, ...)
    NestedList(Vec<ConfigTree>),
}

impl ConfigValue {
    /// Short name of the value kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(s) => s.kind(),
            Self::StringList(_) => "string-list",
            Self::Nested(_) => "section",
            Self::NestedList(_) => "section-list",
        }
    }

    /// Borrow as scalar
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as string if this is a string scalar
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Borrow as string list
    #[inline]
    #[must_use]
    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as nested tree
    #[inline]
    #[must_use]
    pub fn as_tree(&self) -> Option<&ConfigTree> {
        match self {
            Self::Nested(tree) => Some(tree),
            _ => None,
        }
    }

    /// True for string lists
    #[inline]
    #[must_use]
    pub fn is_slice(&self) -> bool {
        matches!(self, Self::StringList(_))
    }

    /// Convert to a JSON value
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Scalar(s) => s.to_json(),
            Self::StringList(items) => {
                JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
            }
            Self::Nested(tree) => tree.to_json(),
            Self::NestedList(trees) => JsonValue::Array(trees.iter().map(ConfigTree::to_json).collect()),
        }
    }
}

impl From<Scalar> for ConfigValue {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::Str(s))
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<u64> for ConfigValue {
    fn from(u: u64) -> Self {
        Self::Scalar(Scalar::Uint(u))
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        Self::Scalar(Scalar::Float(f))
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(items: Vec<String>) -> Self {
        Self::StringList(items)
    }
}

impl From<ConfigTree> for ConfigValue {
    fn from(tree: ConfigTree) -> Self {
        Self::Nested(tree)
    }
}

impl From<Vec<ConfigTree>> for ConfigValue {
    fn from(trees: Vec<ConfigTree>) -> Self {
        Self::NestedList(trees)
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(Scalar::Str(s)) => serializer.serialize_str(s),
            Self::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Self::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            Self::Scalar(Scalar::Uint(u)) => serializer.serialize_u64(*u),
            Self::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            Self::StringList(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Nested(tree) => tree.serialize(serializer),
            Self::NestedList(trees) => {
                let mut seq = serializer.serialize_seq(Some(trees.len()))?;
                for tree in trees {
                    seq.serialize_element(tree)?;
                }
                seq.end()
            }
        }
    }
}

/// Nested configuration document
///
/// Preserves authoring order; equality ignores it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigTree(IndexMap<String, ConfigValue>);

impl ConfigTree {
    /// Create empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Get field value
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    /// Check field presence
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert field, returning the previous value
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Option<ConfigValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove field, keeping the order of the others
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.0.shift_remove(key)
    }

    /// Builder-style insert
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if tree has no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in authoring order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.0.iter()
    }

    /// Identity of this tree as a section instance: `name`, else `type`
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.get(vocab::NAME_KEY)
            .or_else(|| self.get(vocab::TYPE_KEY))
            .and_then(ConfigValue::as_str)
    }

    /// Build tree from a JSON document
    ///
    /// # Errors
    /// Returns error if the document is not an object or holds a list mixing
    /// sections with scalars
    pub fn from_json(value: JsonValue) -> Result<Self, ModelError> {
        match value {
            JsonValue::Object(map) => tree_from_map(map),
            other => Err(ModelError::NotAnObject(json_kind(&other))),
        }
    }

    /// Parse tree from a JSON string
    ///
    /// # Errors
    /// Returns error if JSON is invalid or not tree-shaped
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_json(value)
    }

    /// Parse tree from a YAML string
    ///
    /// # Errors
    /// Returns error if YAML is invalid or not tree-shaped
    pub fn from_yaml(yaml: &str) -> Result<Self, ModelError> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_json(value)
    }

    /// Convert to a JSON document
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigTree {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ConfigTree {
    type Item = (String, ConfigValue);
    type IntoIter = indexmap::map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConfigTree {
    type Item = (&'a String, &'a ConfigValue);
    type IntoIter = indexmap::map::Iter<'a, String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for ConfigTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConfigTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Self::from_json(value).map_err(D::Error::custom)
    }
}

/// Errors building a tree from a structured document
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Document root is not an object
    #[error("configuration root must be an object, got {0}")]
    NotAnObject(&'static str),

    /// List mixing sections and scalars
    #[error("list '{0}' mixes sections with scalar values")]
    MixedList(String),

    /// Invalid JSON input
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Invalid YAML input
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

fn tree_from_map(map: Map<String, JsonValue>) -> Result<ConfigTree, ModelError> {
    map.into_iter()
        .map(|(k, v)| {
            let value = value_from_json(&k, v)?;
            Ok((k, value))
        })
        .collect()
}

fn value_from_json(key: &str, value: JsonValue) -> Result<ConfigValue, ModelError> {
    Ok(match value {
        JsonValue::Null => ConfigValue::Scalar(Scalar::Str(String::new())),
        JsonValue::Bool(b) => ConfigValue::Scalar(Scalar::Bool(b)),
        JsonValue::Number(n) => ConfigValue::Scalar(Scalar::from_number(&n)),
        JsonValue::String(s) => ConfigValue::Scalar(Scalar::Str(s)),
        JsonValue::Object(map) => ConfigValue::Nested(tree_from_map(map)?),
        JsonValue::Array(items) => list_from_json(key, items)?,
    })
}

fn list_from_json(key: &str, items: Vec<JsonValue>) -> Result<ConfigValue, ModelError> {
    if items.is_empty() {
        return Ok(if vocab::is_list_section(key) {
            ConfigValue::NestedList(Vec::new())
        } else {
            ConfigValue::StringList(Vec::new())
        });
    }

    if items.iter().all(JsonValue::is_object) {
        let trees = items
            .into_iter()
            .map(|item| match item {
                JsonValue::Object(map) => tree_from_map(map),
                _ => Err(ModelError::MixedList(key.to_string())),
            })
            .collect::<Result<_, _>>()?;
        return Ok(ConfigValue::NestedList(trees));
    }

    items
        .into_iter()
        .map(|item| match item {
            JsonValue::String(s) => Ok(s),
            JsonValue::Number(n) => Ok(Scalar::from_number(&n).to_string()),
            JsonValue::Bool(b) => Ok(b.to_string()),
            JsonValue::Null => Ok(String::new()),
            JsonValue::Object(_) | JsonValue::Array(_) => Err(ModelError::MixedList(key.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(ConfigValue::StringList)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
