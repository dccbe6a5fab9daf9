//! Flattening and expansion
//!
//! [`flatten`] turns a [`ConfigTree`] into a [`FlatConfig`] keyed by flat
//! keys; [`expand`] is its inverse. Repeated sections are encoded with
//! `{identity}` selectors and an `<index>` marker per instance so expansion
//! can restore list order.
//!
//! Both functions are total: malformed input degrades the affected subtree
//! (kept verbatim, or treated as a plain map) instead of failing.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;

use crate::path::{KeyPath, Segment};
use crate::value::{ConfigTree, ConfigValue, Scalar};
use crate::vocab::{self, INDEX_KEY, SEP, TYPE_KEY};

/// Flattened configuration, ordered by key
pub type FlatConfig = BTreeMap<String, ConfigValue>;

/// Flatten a configuration tree
#[must_use]
pub fn flatten(tree: &ConfigTree) -> FlatConfig {
    let mut out = FlatConfig::new();
    flatten_into("", tree, &mut out);
    out
}

/// Copy of a flat config without index markers
#[must_use]
pub fn without_index_markers(flat: &FlatConfig) -> FlatConfig {
    flat.iter()
        .filter(|(k, _)| !KeyPath::parse(k).is_index_marker())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}{SEP}{field}")
    }
}

fn flatten_into(prefix: &str, tree: &ConfigTree, out: &mut FlatConfig) {
    for (field, value) in tree {
        let key = join(prefix, field);
        match value {
            ConfigValue::Scalar(Scalar::Str(_)) if vocab::is_typed_section(field) => {
                out.insert(join(&key, TYPE_KEY), value.clone());
            }
            ConfigValue::Scalar(_) | ConfigValue::StringList(_) => {
                out.insert(key, value.clone());
            }
            ConfigValue::Nested(sub) if sub.is_empty() => {
                out.insert(key, value.clone());
            }
            ConfigValue::Nested(sub) => flatten_into(&key, sub, out),
            ConfigValue::NestedList(items) if items.is_empty() => {}
            ConfigValue::NestedList(items) => match section_identities(items) {
                Some(ids) => {
                    for (index, (id, item)) in ids.into_iter().zip(items).enumerate() {
                        let instance = format!("{key}{SEP}{{{id}}}");
                        flatten_into(&instance, item, out);
                        out.insert(join(&instance, INDEX_KEY), ConfigValue::from(index as u64));
                    }
                }
                None => {
                    tracing::debug!(%key, "section list without unique identities kept verbatim");
                    out.insert(key, value.clone());
                }
            },
        }
    }
}

/// Identities of every item, or `None` if any is missing, duplicated, or
/// would not survive bracket encoding
fn section_identities(items: &[ConfigTree]) -> Option<Vec<&str>> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| {
            let id = item.identity()?;
            let encodable = !id.contains(['{', '}']);
            (encodable && seen.insert(id)).then_some(id)
        })
        .collect()
}

/// Intermediate trie used by [`expand`]
#[derive(Debug, Default)]
struct Node {
    value: Option<ConfigValue>,
    children: IndexMap<Segment, Node>,
}

impl Node {
    fn insert(&mut self, path: &[Segment], value: ConfigValue) {
        match path.split_first() {
            None => self.value = Some(value),
            Some((head, rest)) => self
                .children
                .entry(head.clone())
                .or_default()
                .insert(rest, value),
        }
    }
}

/// Expand a flat configuration back into a tree
#[must_use]
pub fn expand(flat: &FlatConfig) -> ConfigTree {
    let mut root = Node::default();
    for (key, value) in flat {
        root.insert(KeyPath::parse(key).segments(), value.clone());
    }
    node_into_tree(root).0
}

/// Convert a node to a tree, returning the instance index marker if present
fn node_into_tree(node: Node) -> (ConfigTree, Option<u64>) {
    let mut tree = ConfigTree::new();
    let mut index = None;
    for (segment, child) in node.children {
        match segment {
            Segment::Field(name) if name == INDEX_KEY => {
                index = child.value.as_ref().and_then(index_of);
            }
            Segment::Field(name) => {
                if let Some(value) = node_into_value(&name, child) {
                    tree.insert(name, value);
                }
            }
            Segment::Instance(id) => {
                let literal = format!("{{{id}}}");
                if let Some(value) = node_into_value(&literal, child) {
                    tree.insert(literal, value);
                }
            }
        }
    }
    (tree, index)
}

fn node_into_value(field: &str, node: Node) -> Option<ConfigValue> {
    if node.children.is_empty() {
        return node.value.map(|value| match value {
            ConfigValue::Scalar(Scalar::Str(s)) if vocab::is_typed_section(field) => {
                ConfigValue::Nested(ConfigTree::new().with(TYPE_KEY, s))
            }
            other => other,
        });
    }

    if node.value.is_some() {
        tracing::debug!(field, "flat value shadowed by nested keys, keeping nested keys");
    }

    let all_instances = node
        .children
        .keys()
        .all(|s| matches!(s, Segment::Instance(_)));
    if !all_instances {
        return Some(ConfigValue::Nested(node_into_tree(node).0));
    }

    let mut instances: Vec<(Option<u64>, usize, ConfigTree)> = node
        .children
        .into_iter()
        .enumerate()
        .map(|(position, (segment, child))| {
            let (mut tree, index) = node_into_tree(child);
            if tree.identity().is_none() {
                if let Segment::Instance(id) = segment {
                    tree.insert(vocab::NAME_KEY, id);
                }
            }
            (index, position, tree)
        })
        .collect();
    instances.sort_by_key(|(index, position, _)| (index.is_none(), *index, *position));

    Some(ConfigValue::NestedList(
        instances.into_iter().map(|(_, _, tree)| tree).collect(),
    ))
}

fn index_of(value: &ConfigValue) -> Option<u64> {
    match value.as_scalar()? {
        Scalar::Uint(u) => Some(*u),
        Scalar::Int(i) => u64::try_from(*i).ok(),
        Scalar::Str(s) => s.parse().ok(),
        Scalar::Bool(_) | Scalar::Float(_) => None,
    }
}
