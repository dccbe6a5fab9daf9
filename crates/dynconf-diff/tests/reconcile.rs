//! Diff and classification against the fixture schema

use std::collections::{BTreeMap, BTreeSet};

use dynconf_diff::{
    diff, is_all_dynamic, non_dynamic_keys, reconcile, Change, ChangeSet, DiffOptions, Operation,
};
use dynconf_model::{ConfigValue, FlatConfig};
use dynconf_test_utils::{base_config, fixture_registry, flat, string_list, FIXTURE_VERSION};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn reconcile_against_registry_defaults() {
    let registry = fixture_registry();
    let current = flat(base_config());
    let mut desired_json = base_config();
    desired_json["service"]
        .as_object_mut()
        .unwrap()
        .remove("proto-fd-max");
    desired_json["namespaces"][0]["default-ttl"] = json!(3600);
    let desired = flat(desired_json);

    let changes = reconcile(&desired, &current, FIXTURE_VERSION, &registry).unwrap();
    assert_eq!(
        changes,
        ChangeSet::new().with("namespaces.{test}.default-ttl", Change::update(3600_u64))
    );
    assert!(is_all_dynamic(&changes, FIXTURE_VERSION, &registry).unwrap());
}

#[test]
fn reset_to_default_when_key_dropped() {
    let registry = fixture_registry();
    let mut current_json = base_config();
    current_json["service"]["proto-fd-max"] = json!(30000);
    let current = flat(current_json);
    let mut desired_json = base_config();
    desired_json["service"]
        .as_object_mut()
        .unwrap()
        .remove("proto-fd-max");
    let desired = flat(desired_json);

    let changes = reconcile(&desired, &current, "7.0.0.9", &registry).unwrap();
    assert_eq!(
        changes.get("service.proto-fd-max"),
        Some(&Change::update(15000_u64))
    );
}

#[test]
fn unsupported_version_aborts() {
    let registry = fixture_registry();
    let config = flat(base_config());
    let err = reconcile(&config, &config, "5.7.0", &registry).unwrap_err();
    assert!(err.is_version_error());

    let err = is_all_dynamic(&ChangeSet::new(), "garbage", &registry).unwrap_err();
    assert!(err.is_version_error());
}

#[test]
fn classifier_is_fail_closed() {
    let registry = fixture_registry();
    let changes = ChangeSet::new()
        .with("service.proto-fd-max", Change::update(20000_u64))
        .with("namespaces.{test}.default-ttl", Change::update(10_u64))
        .with("namespaces.{test}.strong-consistency", Change::update(true))
        .with("namespaces.{test}.rack-id", Change::update(2_u64));

    assert!(!is_all_dynamic(&changes, FIXTURE_VERSION, &registry).unwrap());
    assert_eq!(
        non_dynamic_keys(&changes, FIXTURE_VERSION, &registry).unwrap(),
        vec![
            "namespaces.{test}.rack-id".to_string(),
            "namespaces.{test}.strong-consistency".to_string(),
        ]
    );
}

#[test]
fn empty_change_set_is_dynamic() {
    let registry = fixture_registry();
    assert!(is_all_dynamic(&ChangeSet::new(), FIXTURE_VERSION, &registry).unwrap());
}

#[test]
fn typed_section_fields_use_logical_keys() {
    let registry = fixture_registry();
    let changes = ChangeSet::new()
        .with("namespaces.{test}.storage-engine.stop-writes-used-pct", Change::update(80_u64))
        .with("namespaces.{test}.sets.{s1}.disable-eviction", Change::update(true))
        .with("namespaces.{test}.replication-factor", Change::update(3_u64));
    assert!(is_all_dynamic(&changes, FIXTURE_VERSION, &registry).unwrap());
}

#[test]
fn xdr_changes_need_restart() {
    let registry = fixture_registry();
    let changes = ChangeSet::new().with("xdr.dcs.{DC1}.period-ms", Change::update(50_u64));
    assert_eq!(
        non_dynamic_keys(&changes, FIXTURE_VERSION, &registry).unwrap(),
        vec!["xdr.dcs.{DC1}.period-ms".to_string()]
    );
}

fn list_config(items: &[String]) -> FlatConfig {
    let mut flat = FlatConfig::new();
    flat.insert(
        "security.log.report-data-op".to_string(),
        ConfigValue::StringList(items.to_vec()),
    );
    flat
}

fn as_set(value: Option<&ConfigValue>) -> BTreeSet<String> {
    value
        .and_then(ConfigValue::as_string_list)
        .map(|items| items.iter().cloned().collect())
        .unwrap_or_default()
}

proptest! {
    #[test]
    fn list_diff_follows_set_law(
        desired in proptest::collection::vec("[a-e]{1,2}", 0..6),
        current in proptest::collection::vec("[a-e]{1,2}", 0..6),
    ) {
        let report = diff(
            &list_config(&desired),
            &list_config(&current),
            &BTreeMap::new(),
            DiffOptions::default(),
        );
        let d: BTreeSet<String> = desired.iter().cloned().collect();
        let c: BTreeSet<String> = current.iter().cloned().collect();
        let change = report.changes.get("security.log.report-data-op");

        let added = as_set(change.and_then(|ch| ch.get(Operation::Add)));
        let removed = as_set(change.and_then(|ch| ch.get(Operation::Remove)));
        prop_assert_eq!(&added, &d.difference(&c).cloned().collect::<BTreeSet<_>>());
        prop_assert_eq!(&removed, &c.difference(&d).cloned().collect::<BTreeSet<_>>());
        prop_assert_eq!(change.is_none(), d == c);
        prop_assert!(change.map_or(true, |ch| !ch.has(Operation::Update)));
    }

    #[test]
    fn diff_of_identical_configs_is_empty(ttl in 0_u64..100_000, name in "[a-z]{1,8}") {
        let config = flat(json!({
            "service": {"proto-fd-max": ttl},
            "namespaces": [{"name": name, "default-ttl": ttl}]
        }));
        let report = diff(&config, &config, &BTreeMap::new(), DiffOptions::default());
        prop_assert!(report.changes.is_empty());
    }
}

#[test]
fn audit_list_removal_is_dynamic() {
    let registry = fixture_registry();
    let changes = ChangeSet::new().with(
        "security.log.report-data-op",
        Change::remove(string_list(&["ns1"])),
    );
    assert!(is_all_dynamic(&changes, FIXTURE_VERSION, &registry).unwrap());
}
