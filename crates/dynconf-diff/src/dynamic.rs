//! Dynamic-safety classification
//!
//! Decides whether a change-set can be applied to a running node. The check
//! is fail-closed: a single key that cannot change live rejects the whole
//! set.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use dynconf_model::KeyPath;
use dynconf_schema::SchemaRegistry;

use crate::change::{Change, ChangeSet, Operation};
use crate::error::DiffError;

/// Fields that are always changeable live, whatever the schema says
const ALWAYS_DYNAMIC: &[&str] = &["replication-factor"];

/// Contexts that never change live
const STATIC_CONTEXTS: &[&str] = &["xdr"];

/// Fields that are never changeable live
const NEVER_DYNAMIC: &[&str] = &["rack-id"];

/// List fields that can grow live but not shrink
const GROW_ONLY: &[&str] = &["ignore-bins", "ignore-sets", "ship-bins", "ship-sets"];

/// Reason a key cannot be applied live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Context is reconfigured through restart only
    StaticContext,
    /// Field is explicitly never dynamic
    DenyListed,
    /// Removal from a list that can only grow
    GrowOnlyRemoval,
    /// Schema does not mark the field dynamic
    NotDynamic,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StaticContext => "context requires restart",
            Self::DenyListed => "field is never dynamic",
            Self::GrowOnlyRemoval => "list can only grow",
            Self::NotDynamic => "schema marks field static",
        })
    }
}

/// Classify one key against a version's dynamic set
///
/// # Errors
/// Returns the [`Rejection`] when the key cannot change live
pub fn classify(key: &str, change: &Change, dynamic: &BTreeSet<String>) -> Result<(), Rejection> {
    let path = KeyPath::parse(key);
    let field = path.base_field().unwrap_or_default();

    if ALWAYS_DYNAMIC.contains(&field) {
        return Ok(());
    }
    if path.context().is_some_and(|ctx| STATIC_CONTEXTS.contains(&ctx)) {
        return Err(Rejection::StaticContext);
    }
    if NEVER_DYNAMIC.contains(&field) {
        return Err(Rejection::DenyListed);
    }
    if GROW_ONLY.contains(&field) && change.has(Operation::Remove) {
        return Err(Rejection::GrowOnlyRemoval);
    }
    if dynamic.contains(&path.logical_key()) {
        Ok(())
    } else {
        Err(Rejection::NotDynamic)
    }
}

/// Every key of a change-set that cannot change live, in key order
///
/// # Errors
/// Returns error if the version is invalid or has no registered schema
pub fn non_dynamic_keys(
    changes: &ChangeSet,
    version: &str,
    registry: &SchemaRegistry,
) -> Result<Vec<String>, DiffError> {
    let dynamic = registry.dynamic_fields(version)?;
    let rejected: Vec<String> = changes
        .iter()
        .filter_map(|(key, change)| match classify(key, change, dynamic) {
            Ok(()) => None,
            Err(reason) => {
                tracing::debug!(%key, %reason, "change is not dynamic");
                Some(key.to_string())
            }
        })
        .collect();
    Ok(rejected)
}

/// Check if every change can be applied without restart
///
/// # Errors
/// Returns error if the version is invalid or has no registered schema
pub fn is_all_dynamic(
    changes: &ChangeSet,
    version: &str,
    registry: &SchemaRegistry,
) -> Result<bool, DiffError> {
    non_dynamic_keys(changes, version, registry).map(|keys| keys.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| (*k).to_string()).collect()
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn schema_dynamic_set_decides() {
        let set = dynamic(&["service.proto-fd-max", "namespaces.max-ttl"]);
        assert_eq!(classify("service.proto-fd-max", &Change::update(1_u64), &set), Ok(()));
        assert_eq!(classify("namespaces.{test}.max-ttl", &Change::update(1_u64), &set), Ok(()));
        assert_eq!(
            classify("service.cluster-name", &Change::update("c"), &set),
            Err(Rejection::NotDynamic)
        );
    }

    #[test]
    fn replication_factor_always_dynamic() {
        let set = BTreeSet::new();
        assert_eq!(
            classify("namespaces.{test}.replication-factor", &Change::update(3_u64), &set),
            Ok(())
        );
    }

    #[test]
    fn xdr_context_is_static() {
        let set = dynamic(&["xdr.dcs.period-ms"]);
        assert_eq!(
            classify("xdr.dcs.{DC1}.period-ms", &Change::update(10_u64), &set),
            Err(Rejection::StaticContext)
        );
    }

    #[test]
    fn rack_id_denied_even_if_schema_allows() {
        let set = dynamic(&["namespaces.rack-id"]);
        assert_eq!(
            classify("namespaces.{test}.rack-id", &Change::update(1_u64), &set),
            Err(Rejection::DenyListed)
        );
    }

    #[test]
    fn grow_only_lists_cannot_shrink() {
        let set = dynamic(&["security.ignore-sets"]);
        assert_eq!(
            classify("security.ignore-sets", &Change::add(list(&["a"])), &set),
            Ok(())
        );
        let shrink = Change::from_lists(list(&["a"]), list(&["b"])).unwrap();
        assert_eq!(
            classify("security.ignore-sets", &shrink, &set),
            Err(Rejection::GrowOnlyRemoval)
        );
    }
}
