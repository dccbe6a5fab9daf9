//! Flat keys
//!
//! Provides [`KeyPath`] for addressing a field inside a flattened
//! configuration, and [`split_key`] for the raw token view.
//!
//! A flat key is a dot-separated list of segments. A segment wrapped in
//! braces, `{name}`, selects one instance of a repeated section. Dots inside
//! an open brace span are part of the instance name, so file paths work as
//! identities: `logging.{/var/log/aerospike.log}.any`.

use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::vocab::{INDEX_KEY, SEP};

/// One segment of a flat key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Plain field name
    Field(String),
    /// Instance selector of a repeated section (braces stripped)
    Instance(String),
}

impl Segment {
    /// Classify a raw token
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            Some(inner) => Self::Instance(inner.to_string()),
            None => Self::Field(token.to_string()),
        }
    }

    /// Field name, if this is a field segment
    #[inline]
    #[must_use]
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Self::Field(f) => Some(f),
            Self::Instance(_) => None,
        }
    }

    /// Instance identity, if this is an instance selector
    #[inline]
    #[must_use]
    pub fn as_instance(&self) -> Option<&str> {
        match self {
            Self::Instance(i) => Some(i),
            Self::Field(_) => None,
        }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Instance(id) => write!(f, "{{{id}}}"),
        }
    }
}

/// Split a flat key into raw tokens
///
/// Dots inside an open `{...}` span are literal. A brace that is never
/// closed leaves the remainder of the key as a single token.
#[must_use]
pub fn split_key(key: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    if key.is_empty() {
        return tokens;
    }

    let mut current = String::new();
    let mut in_brace = false;
    for c in key.chars() {
        match c {
            '{' if current.is_empty() => {
                in_brace = true;
                current.push(c);
            }
            '}' if in_brace => {
                in_brace = false;
                current.push(c);
            }
            SEP if !in_brace => tokens.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    tokens.push(current);
    tokens
}

/// Parsed flat key
///
/// # Examples
/// - `service.proto-fd-max`
/// - `namespaces.{test}.sets.{s1}.disable-eviction`
/// - `xdr.dcs.{DC1}.namespaces.{ns1}.bin-policy`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KeyPath(Vec<Segment>);

impl KeyPath {
    /// Create from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Parse a flat key
    #[must_use]
    pub fn parse(key: &str) -> Self {
        Self(split_key(key).iter().map(|t| Segment::from_token(t)).collect())
    }

    /// Segments, root to leaf
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check for the empty key
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent key (if not root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Last segment
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Append a field segment, returning new key
    #[must_use]
    pub fn child(&self, field: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Field(field.into()));
        new
    }

    /// Append an instance selector, returning new key
    #[must_use]
    pub fn instance(&self, identity: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Instance(identity.into()));
        new
    }

    /// Top-level context (`service`, `namespaces`, `xdr`, ...)
    #[inline]
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.0.first().and_then(Segment::as_field)
    }

    /// Terminal field name
    #[inline]
    #[must_use]
    pub fn base_field(&self) -> Option<&str> {
        self.0.last().and_then(Segment::as_field)
    }

    /// Check for the index pseudo-field
    #[inline]
    #[must_use]
    pub fn is_index_marker(&self) -> bool {
        self.base_field() == Some(INDEX_KEY)
    }

    /// Key with instance selectors removed
    ///
    /// `xdr.dcs.{DC1}.namespaces.{ns1}.bin-policy` → `xdr.dcs.namespaces.bin-policy`.
    /// Schema catalogs are keyed this way.
    #[must_use]
    pub fn logical_key(&self) -> String {
        let fields: Vec<&str> = self.0.iter().filter_map(Segment::as_field).collect();
        fields.join(".")
    }

    /// Prefix up to and including the nearest instance selector
    #[must_use]
    pub fn section_prefix(&self) -> Option<Self> {
        let pos = self.0.iter().rposition(|s| matches!(s, Segment::Instance(_)))?;
        Some(Self(self.0[..=pos].to_vec()))
    }

    /// All instance-selector prefixes, outermost first
    #[must_use]
    pub fn section_prefixes(&self) -> Vec<Self> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, Segment::Instance(_)))
            .map(|(i, _)| Self(self.0[..=i].to_vec()))
            .collect()
    }

    /// Identity selected right after the field `field`
    ///
    /// `xdr.dcs.{DC1}.name`.instance_of("dcs") → `DC1`.
    #[must_use]
    pub fn instance_of(&self, field: &str) -> Option<&str> {
        self.0
            .windows(2)
            .find(|w| w[0].as_field() == Some(field))
            .and_then(|w| w[1].as_instance())
    }

    /// Check if this key is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Segments after `ancestor`, if it is a prefix
    #[must_use]
    pub fn relative_to(&self, ancestor: &Self) -> Option<&[Segment]> {
        ancestor.is_prefix_of(self).then(|| &self.0[ancestor.0.len()..])
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.0.iter()
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEP}")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for KeyPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<Vec<Segment>> for KeyPath {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}
