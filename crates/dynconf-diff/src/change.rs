//! Change-sets
//!
//! Provides [`Change`], the per-key edit produced by the diff engine, and
//! [`ChangeSet`], the sorted flat-key → change map consumed by the
//! classifier and the command compiler.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt::{self, Display, Formatter};

use dynconf_model::ConfigValue;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Kind of edit carried by a [`Change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// Replace the value
    Update,
    /// Add list elements, or create an instance
    Add,
    /// Remove list elements, or destroy an instance
    Remove,
}

impl Operation {
    /// Lower-case name used in serialized change-sets
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Add and/or remove sides of a set edit, at least one present
///
/// Built only through [`Change::add`], [`Change::remove`], [`Change::set`]
/// and [`Change::from_lists`].
#[derive(Debug, Clone, PartialEq)]
pub struct SetEdit {
    add: Option<ConfigValue>,
    remove: Option<ConfigValue>,
}

impl SetEdit {
    /// Elements (or identity) to add
    #[inline]
    #[must_use]
    pub fn add(&self) -> Option<&ConfigValue> {
        self.add.as_ref()
    }

    /// Elements (or identity) to remove
    #[inline]
    #[must_use]
    pub fn remove(&self) -> Option<&ConfigValue> {
        self.remove.as_ref()
    }
}

/// Edit to one flat key
///
/// Either a plain update or a set edit; never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Replace the value
    Update(ConfigValue),
    /// Add and/or remove elements
    Set(SetEdit),
}

impl Change {
    /// Plain update
    #[inline]
    #[must_use]
    pub fn update(value: impl Into<ConfigValue>) -> Self {
        Self::Update(value.into())
    }

    /// Add-only set edit
    #[inline]
    #[must_use]
    pub fn add(value: impl Into<ConfigValue>) -> Self {
        Self::Set(SetEdit {
            add: Some(value.into()),
            remove: None,
        })
    }

    /// Remove-only set edit
    #[inline]
    #[must_use]
    pub fn remove(value: impl Into<ConfigValue>) -> Self {
        Self::Set(SetEdit {
            add: None,
            remove: Some(value.into()),
        })
    }

    /// Set edit from optional sides; `None` if both are absent
    #[must_use]
    pub fn set(add: Option<ConfigValue>, remove: Option<ConfigValue>) -> Option<Self> {
        match (add, remove) {
            (None, None) => None,
            (add, remove) => Some(Self::Set(SetEdit { add, remove })),
        }
    }

    /// Set edit from element lists; `None` if both are empty
    #[must_use]
    pub fn from_lists(add: Vec<String>, remove: Vec<String>) -> Option<Self> {
        let side = |list: Vec<String>| (!list.is_empty()).then(|| ConfigValue::StringList(list));
        Self::set(side(add), side(remove))
    }

    /// Value carried for an operation
    #[must_use]
    pub fn get(&self, op: Operation) -> Option<&ConfigValue> {
        match (self, op) {
            (Self::Update(v), Operation::Update) => Some(v),
            (Self::Set(edit), Operation::Add) => edit.add(),
            (Self::Set(edit), Operation::Remove) => edit.remove(),
            _ => None,
        }
    }

    /// Check if the change carries an operation
    #[inline]
    #[must_use]
    pub fn has(&self, op: Operation) -> bool {
        self.get(op).is_some()
    }

    /// Operations carried, adds before removes
    pub fn operations(&self) -> impl Iterator<Item = (Operation, &ConfigValue)> {
        [Operation::Update, Operation::Add, Operation::Remove]
            .into_iter()
            .filter_map(move |op| self.get(op).map(|v| (op, v)))
    }
}

impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ops: Vec<_> = self.operations().collect();
        let mut map = serializer.serialize_map(Some(ops.len()))?;
        for (op, value) in ops {
            map.serialize_entry(op.as_str(), value)?;
        }
        map.end()
    }
}

/// Flat key → change, iterated in sorted key order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<String, Change>);

impl ChangeSet {
    /// Create empty change-set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a change, replacing any previous change for the key
    pub fn insert(&mut self, key: impl Into<String>, change: Change) -> Option<Change> {
        self.0.insert(key.into(), change)
    }

    /// Insert a change unless the key already has one
    ///
    /// Returns `true` if inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, change: Change) -> bool {
        match self.0.entry(key.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(change);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, change: Change) -> Self {
        self.insert(key, change);
        self
    }

    /// Change for a key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Change> {
        self.0.get(key)
    }

    /// Check if a key has a change
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of changed keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Changed keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Change)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, Change)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ChangeSet {
    type Item = (String, Change);
    type IntoIter = btree_map::IntoIter<String, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
