//! Testing utilities for dynconf workspace
//!
//! Shared fixtures and tree builders.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use dynconf_model::{flatten, ConfigTree, ConfigValue, FlatConfig};
use dynconf_schema::{MemorySource, SchemaRegistry};
use serde_json::Value as JsonValue;

/// Base version of the bundled fixture schema
pub const FIXTURE_VERSION: &str = "7.0.0";

const FIXTURE_SCHEMA: &str = include_str!("../fixtures/7.0.0.json");

pub fn fixture_schema() -> JsonValue {
    serde_json::from_str(FIXTURE_SCHEMA).unwrap()
}

/// Directory holding the fixture schema files
pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

pub fn fixture_registry() -> SchemaRegistry {
    SchemaRegistry::from_source(&MemorySource::new().with(FIXTURE_VERSION, fixture_schema())).unwrap()
}

pub fn tree(value: JsonValue) -> ConfigTree {
    ConfigTree::from_json(value).unwrap()
}

pub fn flat(value: JsonValue) -> FlatConfig {
    flatten(&tree(value))
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

pub fn string_list(items: &[&str]) -> ConfigValue {
    ConfigValue::StringList(strings(items))
}

pub fn defaults(pairs: &[(&str, ConfigValue)]) -> BTreeMap<String, ConfigValue> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

/// Minimal cluster configuration accepted by the fixture schema
pub fn base_config() -> JsonValue {
    serde_json::json!({
        "service": {"cluster-name": "prod", "proto-fd-max": 15000},
        "network": {
            "service": {"port": 3000},
            "heartbeat": {"mode": "mesh", "port": 3002, "interval": 150},
            "fabric": {"port": 3001}
        },
        "namespaces": [{
            "name": "test",
            "replication-factor": 2,
            "default-ttl": 0,
            "storage-engine": {"type": "memory", "data-size": 1073741824_u64}
        }],
        "logging": [{"name": "console", "any": "info"}]
    })
}
