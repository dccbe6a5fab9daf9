//! Desired-vs-current diff
//!
//! Two passes over flat configurations:
//!
//! 1. every desired key against current (new values, new instances,
//!    partially configured instances),
//! 2. every current key missing from desired (removed instances, reset to
//!    schema default).
//!
//! The first pass wins when both produce a change for one key. The diff is
//! directional: swapping the inputs does not invert the result.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use dynconf_model::vocab::{self, NAME_KEY, TYPE_KEY};
use dynconf_model::{ConfigValue, FlatConfig, KeyPath, Scalar, Segment};
use dynconf_schema::SchemaRegistry;

use crate::change::{Change, ChangeSet};
use crate::error::DiffError;

/// Fields that identify a node rather than describe the cluster
///
/// Command-vocabulary names; stored plural list fields are matched through
/// their singular form.
const NODE_SPECIFIC: &[&str] = &[
    "node-id",
    "port",
    "access-port",
    "address",
    "access-address",
    "alternate-access-address",
    "alternate-access-port",
    "tls-address",
    "tls-port",
    "tls-access-address",
    "tls-access-port",
    "tls-alternate-access-address",
    "tls-alternate-access-port",
    "external-address",
    "interface-address",
    "mesh-seed-address-ports",
    "tls-mesh-seed-address-ports",
    "file",
    "files",
    "device",
    "devices",
    "mounts",
    "pidfile",
    "service-threads",
    "batch-index-threads",
    "mtu",
];

/// Context whose sinks are per-node files
const LOGGING_CONTEXT: &str = "logging";

/// Diff tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Skip node-identifying fields and the logging context
    pub skip_node_specific: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            skip_node_specific: true,
        }
    }
}

/// Diff result with diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    /// Changes to apply
    pub changes: ChangeSet,
    /// Keys that needed a schema default but have no unambiguous one
    pub unresolved_defaults: BTreeSet<String>,
}

/// Compute the change-set turning `current` into `desired`
///
/// Version errors abort; keys with no usable default are logged and left
/// unchanged.
///
/// # Errors
/// Returns error if the version is invalid or has no registered schema
pub fn reconcile(
    desired: &FlatConfig,
    current: &FlatConfig,
    version: &str,
    registry: &SchemaRegistry,
) -> Result<ChangeSet, DiffError> {
    let report = diff_with_registry(desired, current, version, registry, DiffOptions::default())?;
    for key in &report.unresolved_defaults {
        tracing::warn!(%key, version, "no unambiguous schema default, key left unchanged");
    }
    Ok(report.changes)
}

/// [`diff`] with the defaults of a registered version
///
/// # Errors
/// Returns error if the version is invalid or has no registered schema
pub fn diff_with_registry(
    desired: &FlatConfig,
    current: &FlatConfig,
    version: &str,
    registry: &SchemaRegistry,
    options: DiffOptions,
) -> Result<DiffReport, DiffError> {
    let defaults = registry.defaults(version)?;
    let report = diff(desired, current, defaults, options);
    tracing::debug!(
        version,
        changes = report.changes.len(),
        unresolved = report.unresolved_defaults.len(),
        "configuration diff computed"
    );
    Ok(report)
}

/// Compute the change-set turning `current` into `desired`
///
/// `defaults` maps logical keys to the value a key takes when it is not
/// configured.
#[must_use]
pub fn diff(
    desired: &FlatConfig,
    current: &FlatConfig,
    defaults: &BTreeMap<String, ConfigValue>,
    options: DiffOptions,
) -> DiffReport {
    let mut engine = Engine {
        desired,
        current,
        defaults,
        options,
        desired_instances: instance_prefixes(desired),
        current_instances: instance_prefixes(current),
        filled: HashSet::new(),
        report: DiffReport::default(),
    };
    engine.desired_pass();
    engine.current_pass();
    engine.report
}

struct Engine<'a> {
    desired: &'a FlatConfig,
    current: &'a FlatConfig,
    defaults: &'a BTreeMap<String, ConfigValue>,
    options: DiffOptions,
    desired_instances: HashSet<String>,
    current_instances: HashSet<String>,
    /// Partially configured instances already reset to defaults
    filled: HashSet<String>,
    report: DiffReport,
}

impl Engine<'_> {
    fn desired_pass(&mut self) {
        for (key, value) in self.desired {
            let path = KeyPath::parse(key);
            if self.is_excluded(&path) {
                continue;
            }

            if let Some(current) = self.current.get(key) {
                if let Some(change) = compare(value, current) {
                    self.report.changes.insert(key.clone(), change);
                }
                continue;
            }

            match path.section_prefix() {
                Some(section) if !self.current_instances.contains(&section.to_string()) => {
                    if let Some(change) = new_instance_change(&path, value) {
                        self.report.changes.insert(key.clone(), change);
                    }
                }
                Some(section) => {
                    self.fill_partial_section(&section);
                    if let Some(change) = leaf_change(value) {
                        self.report.changes.insert(key.clone(), change);
                    }
                }
                None => {
                    if let Some(change) = leaf_change(value) {
                        self.report.changes.insert(key.clone(), change);
                    }
                }
            }
        }
    }

    /// Reset current keys of an instance that desired only partially covers
    fn fill_partial_section(&mut self, section: &KeyPath) {
        let rendered = section.to_string();
        if !self.filled.insert(rendered) {
            return;
        }
        for (key, value) in self.current {
            let path = KeyPath::parse(key);
            if !section.is_prefix_of(&path)
                || self.is_excluded(&path)
                || self.desired.contains_key(key)
                || self.report.changes.contains_key(key)
            {
                continue;
            }
            self.reset(key, &path, value);
        }
    }

    fn current_pass(&mut self) {
        for (key, value) in self.current {
            if self.desired.contains_key(key) || self.report.changes.contains_key(key) {
                continue;
            }
            let path = KeyPath::parse(key);
            if self.is_excluded(&path) {
                continue;
            }

            let removed = path
                .section_prefixes()
                .into_iter()
                .find(|prefix| !self.desired_instances.contains(&prefix.to_string()));
            if let Some(instance) = removed {
                if path.parent().as_ref() == Some(&instance) {
                    if let Some(identity) = identity_value(&path, value) {
                        self.report
                            .changes
                            .insert(key.clone(), Change::remove(identity));
                    }
                }
                continue;
            }

            self.reset(key, &path, value);
        }
    }

    /// Return a key absent from desired to its unconfigured state
    fn reset(&mut self, key: &str, path: &KeyPath, current: &ConfigValue) {
        match current {
            ConfigValue::StringList(items) => {
                if !items.is_empty() {
                    self.report
                        .changes
                        .insert_if_absent(key, Change::remove(current.clone()));
                }
            }
            ConfigValue::Nested(_) => {}
            ConfigValue::Scalar(_) | ConfigValue::NestedList(_) => {
                match self.defaults.get(&path.logical_key()) {
                    Some(default) => {
                        if compare(default, current).is_some() {
                            self.report
                                .changes
                                .insert_if_absent(key, Change::Update(default.clone()));
                        }
                    }
                    None => {
                        self.report.unresolved_defaults.insert(key.to_string());
                    }
                }
            }
        }
    }

    fn is_excluded(&self, path: &KeyPath) -> bool {
        if path.is_index_marker() {
            return true;
        }
        self.options.skip_node_specific
            && (path.context() == Some(LOGGING_CONTEXT)
                || path.base_field().is_some_and(is_node_specific))
    }
}

fn is_node_specific(field: &str) -> bool {
    NODE_SPECIFIC.contains(&field) || NODE_SPECIFIC.contains(&vocab::singular_of(field))
}

/// Rendered form of every instance selector prefix in a flat config
fn instance_prefixes(flat: &FlatConfig) -> HashSet<String> {
    flat.keys()
        .flat_map(|key| KeyPath::parse(key).section_prefixes())
        .map(|prefix| prefix.to_string())
        .collect()
}

/// Identity carried by `<section>.{id}.name` (or `.type`)
fn identity_value<'v>(path: &KeyPath, value: &'v ConfigValue) -> Option<&'v str> {
    if !is_identity_key(path) {
        return None;
    }
    let segments = path.segments();
    let selector = segments.len().checked_sub(2).and_then(|i| segments[i].as_instance())?;
    value.as_str().filter(|id| *id == selector)
}

/// Change for a key of an instance current does not have
fn new_instance_change(path: &KeyPath, value: &ConfigValue) -> Option<Change> {
    match identity_value(path, value) {
        Some(identity) => Some(Change::add(identity)),
        None => leaf_change(value),
    }
}

/// Change for a desired key current does not have
fn leaf_change(value: &ConfigValue) -> Option<Change> {
    match value {
        ConfigValue::StringList(items) if items.is_empty() => None,
        ConfigValue::StringList(_) => Some(Change::add(value.clone())),
        ConfigValue::Scalar(_) | ConfigValue::NestedList(_) => Some(Change::Update(value.clone())),
        ConfigValue::Nested(_) => None,
    }
}

/// Change turning `current` into `desired`, `None` if equal
fn compare(desired: &ConfigValue, current: &ConfigValue) -> Option<Change> {
    use ConfigValue as V;

    match (desired, current) {
        (V::Nested(_), _) | (_, V::Nested(_)) => None,
        (V::NestedList(_), _) | (_, V::NestedList(_)) => {
            (desired != current).then(|| Change::Update(desired.clone()))
        }
        (V::StringList(d), V::StringList(c)) => set_change(d, c),
        (V::StringList(d), V::Scalar(c)) => set_change(d, &scalar_as_list(c)),
        (V::Scalar(d), V::StringList(c)) => set_change(&scalar_as_list(d), c),
        (V::Scalar(d), V::Scalar(c)) => {
            (!scalars_equal(d, c)).then(|| Change::Update(desired.clone()))
        }
    }
}

/// `Add = D − C`, `Remove = C − D`, in first-seen order without duplicates
fn set_change(desired: &[String], current: &[String]) -> Option<Change> {
    let minus = |a: &[String], b: &[String]| {
        let exclude: HashSet<&String> = b.iter().collect();
        let mut seen = HashSet::new();
        a.iter()
            .filter(|item| !exclude.contains(item) && seen.insert(*item))
            .cloned()
            .collect::<Vec<_>>()
    };
    Change::from_lists(minus(desired, current), minus(current, desired))
}

fn scalar_as_list(scalar: &Scalar) -> Vec<String> {
    let rendered = scalar.to_string();
    if is_empty_like(&rendered) {
        Vec::new()
    } else {
        vec![rendered]
    }
}

fn is_empty_like(s: &str) -> bool {
    s.is_empty() || s == "null"
}

fn scalars_equal(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Str(x), Scalar::Str(y)) => x == y || (is_empty_like(x) && is_empty_like(y)),
        (Scalar::Bool(x), Scalar::Bool(y)) => x == y,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => numbers_equal(&x, &y),
            _ => a.to_string() == b.to_string(),
        },
    }
}

/// Numeric reading of a scalar; live values arrive as strings
fn as_number(s: &Scalar) -> Option<Scalar> {
    match s {
        Scalar::Int(_) | Scalar::Uint(_) | Scalar::Float(_) => Some(s.clone()),
        Scalar::Str(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .map(Scalar::Uint)
                .or_else(|_| text.parse::<i64>().map(Scalar::Int))
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Scalar::Float))
        }
        Scalar::Bool(_) => None,
    }
}

fn numbers_equal(a: &Scalar, b: &Scalar) -> bool {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() <= f64::EPSILON * x.abs().max(y.abs()),
            _ => false,
        },
    }
}

fn as_integer(s: &Scalar) -> Option<i128> {
    match s {
        Scalar::Int(i) => Some(i128::from(*i)),
        Scalar::Uint(u) => Some(i128::from(*u)),
        Scalar::Str(_) | Scalar::Bool(_) | Scalar::Float(_) => None,
    }
}

/// Check if a key names a section instance's identity field
#[must_use]
pub fn is_identity_key(path: &KeyPath) -> bool {
    matches!(
        path.segments(),
        [.., Segment::Field(_), Segment::Instance(_), Segment::Field(field)]
            if field == NAME_KEY || field == TYPE_KEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynconf_model::flatten;
    use dynconf_test_utils::tree;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn flat(value: serde_json::Value) -> FlatConfig {
        flatten(&tree(value))
    }

    fn defaults(pairs: &[(&str, ConfigValue)]) -> BTreeMap<String, ConfigValue> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    fn run(desired: &FlatConfig, current: &FlatConfig, defaults: &BTreeMap<String, ConfigValue>) -> DiffReport {
        diff(desired, current, defaults, DiffOptions::default())
    }

    fn list(items: &[&str]) -> ConfigValue {
        ConfigValue::StringList(items.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn identical_configs_have_no_changes() {
        let config = flat(json!({
            "service": {"proto-fd-max": 15000},
            "namespaces": [{"name": "test", "replication-factor": 2}]
        }));
        let report = run(&config, &config, &BTreeMap::new());
        assert!(report.changes.is_empty());
        assert!(report.unresolved_defaults.is_empty());
    }

    #[test]
    fn scalar_update() {
        let desired = flat(json!({"service": {"proto-fd-max": 20000}}));
        let current = flat(json!({"service": {"proto-fd-max": 15000}}));
        let report = run(&desired, &current, &BTreeMap::new());
        assert_eq!(
            report.changes.get("service.proto-fd-max"),
            Some(&Change::update(20000_u64))
        );
    }

    #[test]
    fn live_strings_equal_typed_values() {
        let desired = flat(json!({"service": {"proto-fd-max": 15000, "enable-health-check": true}}));
        let current = flat(json!({"service": {"proto-fd-max": "15000", "enable-health-check": "true"}}));
        assert!(run(&desired, &current, &BTreeMap::new()).changes.is_empty());

        let desired = flat(json!({"namespaces": [{"name": "test", "evict-tenths-pct": 1.0, "ratio": 2.5, "ttl": -3}]}));
        let current = flat(json!({"namespaces": [{"name": "test", "evict-tenths-pct": "1.0", "ratio": "2.50", "ttl": "-3"}]}));
        assert!(run(&desired, &current, &BTreeMap::new()).changes.is_empty());

        let current = flat(json!({"namespaces": [{"name": "test", "evict-tenths-pct": "1.5", "ratio": "2.5", "ttl": "-3"}]}));
        assert_eq!(
            run(&desired, &current, &BTreeMap::new()).changes,
            ChangeSet::new().with("namespaces.{test}.evict-tenths-pct", Change::update(1.0_f64))
        );
    }

    #[test]
    fn numbers_compare_across_kinds() {
        let desired = flat(json!({"service": {"a": 1, "b": 2.0}}));
        let current = flat(json!({"service": {"a": 1.0, "b": 2}}));
        assert!(run(&desired, &current, &BTreeMap::new()).changes.is_empty());
    }

    #[test]
    fn empty_like_strings_are_equal() {
        let desired = flat(json!({"service": {"cluster-name": ""}}));
        let current = flat(json!({"service": {"cluster-name": "null"}}));
        assert!(run(&desired, &current, &BTreeMap::new()).changes.is_empty());
    }

    #[test]
    fn list_diff_is_set_difference() {
        let desired = flat(json!({"xdr": {"dcs": [{"name": "DC1", "node-address-ports": ["a:3000", "b:3000"]}]}}));
        let current = flat(json!({"xdr": {"dcs": [{"name": "DC1", "node-address-ports": ["b:3000", "c:3000"]}]}}));
        let report = run(&desired, &current, &BTreeMap::new());
        assert_eq!(
            report.changes.get("xdr.dcs.{DC1}.node-address-ports"),
            Change::set(Some(list(&["a:3000"])), Some(list(&["c:3000"]))).as_ref()
        );
    }

    #[test]
    fn scalar_counts_as_one_element_list() {
        let desired = flat(json!({"security": {"log": {"report-data-op": ["ns1", "ns2"]}}}));
        let current = flat(json!({"security": {"log": {"report-data-op": "ns1"}}}));
        let report = run(&desired, &current, &BTreeMap::new());
        assert_eq!(
            report.changes.get("security.log.report-data-op"),
            Some(&Change::add(list(&["ns2"])))
        );
    }

    #[test]
    fn new_instance_adds_identity_and_fields() {
        let desired = flat(json!({"namespaces": [
            {"name": "test", "replication-factor": 2},
            {"name": "bar", "replication-factor": 1, "ignore": ["x"]}
        ]}));
        let current = flat(json!({"namespaces": [{"name": "test", "replication-factor": 2}]}));
        let report = run(&desired, &current, &BTreeMap::new());

        assert_eq!(report.changes.get("namespaces.{bar}.name"), Some(&Change::add("bar")));
        assert_eq!(
            report.changes.get("namespaces.{bar}.replication-factor"),
            Some(&Change::update(1_u64))
        );
        assert_eq!(report.changes.get("namespaces.{bar}.ignore"), Some(&Change::add(list(&["x"]))));
        assert!(!report.changes.contains_key("namespaces.{bar}.<index>"));
        assert!(!report.changes.contains_key("namespaces.{test}.<index>"));
    }

    #[test]
    fn removed_instance_removes_identity_only() {
        let desired = flat(json!({"xdr": {"dcs": [{"name": "DC1"}]}}));
        let current = flat(json!({"xdr": {"dcs": [
            {"name": "DC1"},
            {"name": "DC3", "period-ms": 100, "namespaces": [{"name": "ns1", "bin-policy": "all"}]}
        ]}}));
        let report = run(&desired, &current, &BTreeMap::new());

        assert_eq!(
            report.changes,
            ChangeSet::new().with("xdr.dcs.{DC3}.name", Change::remove("DC3"))
        );
        assert!(report.unresolved_defaults.is_empty());
    }

    #[test]
    fn removed_nested_instance_under_kept_parent() {
        let desired = flat(json!({"xdr": {"dcs": [{"name": "DC1", "namespaces": []}]}}));
        let current = flat(json!({"xdr": {"dcs": [{"name": "DC1", "namespaces": [{"name": "ns1", "bin-policy": "all"}]}]}}));
        let report = run(&desired, &current, &BTreeMap::new());
        assert_eq!(
            report.changes,
            ChangeSet::new().with("xdr.dcs.{DC1}.namespaces.{ns1}.name", Change::remove("ns1"))
        );
    }

    #[test]
    fn absent_scalar_reset_to_default() {
        let desired = flat(json!({"service": {}}));
        let current = flat(json!({"service": {"proto-fd-max": 20000, "cluster-name": "c1"}}));
        let defaults = defaults(&[("service.proto-fd-max", ConfigValue::from(15000_u64))]);
        let report = run(&desired, &current, &defaults);

        assert_eq!(
            report.changes,
            ChangeSet::new().with("service.proto-fd-max", Change::update(15000_u64))
        );
        assert_eq!(
            report.unresolved_defaults.into_iter().collect::<Vec<_>>(),
            vec!["service.cluster-name".to_string()]
        );
    }

    #[test]
    fn absent_scalar_equal_to_default_is_unchanged() {
        let desired = flat(json!({"service": {}}));
        let current = flat(json!({"service": {"proto-fd-max": "15000"}}));
        let defaults = defaults(&[("service.proto-fd-max", ConfigValue::from(15000_u64))]);
        assert!(run(&desired, &current, &defaults).changes.is_empty());
    }

    #[test]
    fn absent_list_removed_whole() {
        let desired = flat(json!({"namespaces": [{"name": "test"}]}));
        let current = flat(json!({"namespaces": [{"name": "test", "ignore": ["a", "b"], "empty": []}]}));
        let report = run(&desired, &current, &BTreeMap::new());
        assert_eq!(
            report.changes,
            ChangeSet::new().with("namespaces.{test}.ignore", Change::remove(list(&["a", "b"])))
        );
    }

    #[test]
    fn partial_section_fills_siblings_and_emits_key() {
        let desired = flat(json!({"namespaces": [{"name": "test", "max-ttl": 100}]}));
        let current = flat(json!({"namespaces": [{"name": "test", "default-ttl": 50}]}));
        let defaults = defaults(&[("namespaces.default-ttl", ConfigValue::from(0_u64))]);
        let report = run(&desired, &current, &defaults);

        assert_eq!(
            report.changes,
            ChangeSet::new()
                .with("namespaces.{test}.default-ttl", Change::update(0_u64))
                .with("namespaces.{test}.max-ttl", Change::update(100_u64))
        );
    }

    #[test]
    fn node_specific_fields_skipped() {
        let desired = flat(json!({
            "network": {
                "service": {"port": 3000, "addresses": ["any"], "access-addresses": ["10.0.0.1"]},
                "heartbeat": {"addresses": ["10.0.0.1"], "mesh-seed-address-ports": ["10.0.0.2:3002"]}
            },
            "namespaces": [{"name": "test", "storage-engine": {"type": "device", "devices": ["/dev/sdb"]}}],
            "logging": [{"name": "console", "any": "info"}]
        }));
        let current = flat(json!({
            "network": {
                "service": {"port": 4000, "addresses": ["10.0.0.9"], "access-addresses": ["10.0.0.9"]},
                "heartbeat": {"addresses": ["10.0.0.9"], "mesh-seed-address-ports": ["10.0.0.3:3002"]}
            },
            "namespaces": [{"name": "test", "storage-engine": {"type": "device", "devices": ["/dev/sdc"]}}],
            "logging": [{"name": "console", "any": "debug"}]
        }));
        assert_eq!(run(&desired, &current, &BTreeMap::new()).changes, ChangeSet::new());

        let report = diff(
            &desired,
            &current,
            &BTreeMap::new(),
            DiffOptions { skip_node_specific: false },
        );
        assert!(report.changes.contains_key("network.service.port"));
        assert!(report.changes.contains_key("network.service.access-addresses"));
        assert!(report.changes.contains_key("network.heartbeat.addresses"));
        assert!(report.changes.contains_key("logging.{console}.any"));
    }

    #[test]
    fn degraded_lists_update_when_unequal() {
        let desired = flat(json!({"namespaces": [{"name": "test", "storage-engine": "memory", "odd": [{"x": 1}]}]}));
        let current = flat(json!({"namespaces": [{"name": "test", "storage-engine": "memory", "odd": [{"x": 2}]}]}));
        let report = run(&desired, &current, &BTreeMap::new());
        assert!(matches!(
            report.changes.get("namespaces.{test}.odd"),
            Some(Change::Update(ConfigValue::NestedList(_)))
        ));
    }

    #[test]
    fn diff_is_directional() {
        let a = flat(json!({"service": {"proto-fd-max": 20000}, "namespaces": [{"name": "n1"}]}));
        let b = flat(json!({"service": {"proto-fd-max": 15000}}));
        let defaults = defaults(&[("service.proto-fd-max", ConfigValue::from(15000_u64))]);

        let forward = run(&a, &b, &defaults).changes;
        let backward = run(&b, &a, &defaults).changes;
        assert_eq!(forward.get("namespaces.{n1}.name"), Some(&Change::add("n1")));
        assert_eq!(backward.get("namespaces.{n1}.name"), Some(&Change::remove("n1")));
        assert_ne!(forward, backward);
    }

    #[test]
    fn identity_keys() {
        assert!(is_identity_key(&KeyPath::parse("xdr.dcs.{DC1}.name")));
        assert!(is_identity_key(&KeyPath::parse("namespaces.{t}.sets.{s}.name")));
        assert!(!is_identity_key(&KeyPath::parse("namespaces.{t}.storage-engine.type")));
        assert!(!is_identity_key(&KeyPath::parse("service.name")));
        assert!(is_identity_key(&KeyPath::parse("network.tls.{t1}.name")));
    }
}
