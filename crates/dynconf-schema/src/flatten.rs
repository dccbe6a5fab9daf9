//! Schema document flattening
//!
//! A schema is flattened the same way a configuration tree is: object keys
//! are joined with `.`, array elements are addressed by their numeric
//! index. The values of the annotation keywords (`default`, `dynamic`,
//! `required`, `enum`) are kept whole as leaves.
//!
//! [`logical_key`] then maps a flattened schema path onto the configuration
//! key it describes by dropping structural keywords and branch markers:
//!
//! `properties.namespaces.items.properties.storage-engine.oneOf.1.properties.data-size`
//! → `namespaces.storage-engine.data-size`

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

/// Flattened schema, ordered by path
pub(crate) type FlatSchema = BTreeMap<String, JsonValue>;

/// Keywords whose value is kept as a single leaf
const ANNOTATIONS: &[&str] = &["default", "dynamic", "required", "enum"];

/// Keywords that introduce numbered alternatives
const BRANCHES: &[&str] = &["oneOf", "anyOf"];

/// Structural keywords that never name a configuration field
const STRUCTURAL: &[&str] = &["properties", "items"];

pub(crate) fn flatten_schema(schema: &JsonValue) -> FlatSchema {
    let mut out = FlatSchema::new();
    walk("", schema, false, &mut out);
    out
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

/// `in_properties` is set while walking a `properties` map, whose keys are
/// field names rather than keywords.
fn walk(prefix: &str, value: &JsonValue, in_properties: bool, out: &mut FlatSchema) {
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                let path = join(prefix, key);
                if !in_properties && ANNOTATIONS.contains(&key.as_str()) {
                    out.insert(path, child.clone());
                } else {
                    walk(&path, child, !in_properties && key == "properties", out);
                }
            }
        }
        JsonValue::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                walk(&join(prefix, &i.to_string()), child, false, out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}

/// Configuration key described by a flattened schema path
///
/// The path must already have its trailing keyword removed.
pub(crate) fn logical_key(path: &str) -> String {
    let mut fields = Vec::new();
    let mut segments = path.split('.').peekable();
    let mut field_expected = false;
    while let Some(segment) = segments.next() {
        if field_expected {
            fields.push(segment);
            field_expected = false;
            continue;
        }
        if segment == "properties" {
            field_expected = true;
        } else if BRANCHES.contains(&segment) {
            segments.next_if(|s| s.parse::<usize>().is_ok());
        } else if STRUCTURAL.contains(&segment) || segment.parse::<usize>().is_ok() {
            // structural, no field
        } else {
            fields.push(segment);
        }
    }
    fields.join(".")
}

/// Split `a.b.default` into (`a.b`, `default`)
pub(crate) fn split_keyword(path: &str) -> (&str, &str) {
    match path.rsplit_once('.') {
        Some((head, keyword)) => (head, keyword),
        None => ("", path),
    }
}
