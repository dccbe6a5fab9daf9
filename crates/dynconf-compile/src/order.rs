//! Dependency ordering of a change-set
//!
//! Cross-cluster replication objects depend on each other: a namespace can
//! only be attached to an existing DC, and a DC can only be deleted once its
//! namespaces are detached. [`rearrange`] emits changes in five buckets:
//!
//! 1. DC namespace removals
//! 2. DC create / delete
//! 3. direct fields of DCs that survive
//! 4. DC namespace additions
//! 5. everything else
//!
//! Keys keep their sorted order inside a bucket. Fields of a DC being
//! deleted, and of a DC namespace being removed, are dropped.

use std::collections::HashSet;

use dynconf_diff::{Change, ChangeSet, Operation};
use dynconf_model::vocab::NAME_KEY;
use dynconf_model::{KeyPath, Segment};

const XDR_CONTEXT: &str = "xdr";
const DCS: &str = "dcs";
const DC_NAMESPACES: &str = "namespaces";

/// Position of a key inside the replication hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XdrShape<'a> {
    /// `xdr.dcs.{dc}.name`
    DcIdentity { dc: &'a str },
    /// `xdr.dcs.{dc}.<field>`
    DcField { dc: &'a str, field: &'a str },
    /// `xdr.dcs.{dc}.namespaces.{ns}.name`
    NamespaceIdentity { dc: &'a str, ns: &'a str },
    /// `xdr.dcs.{dc}.namespaces.{ns}.<...>`
    NamespaceField { dc: &'a str, ns: &'a str },
    /// `xdr.dcs.{dc}.<...>` deeper than a direct field
    DcNested { dc: &'a str },
    /// Top-level `xdr` field
    Root,
    /// Not in the `xdr` context
    Outside,
}

impl<'a> XdrShape<'a> {
    pub(crate) fn of(path: &'a KeyPath) -> Self {
        use Segment::{Field, Instance};

        let segments = path.segments();
        match segments {
            [Field(ctx), rest @ ..] if ctx == XDR_CONTEXT => match rest {
                [Field(dcs), Instance(dc), Field(name)] if dcs == DCS && name == NAME_KEY => {
                    Self::DcIdentity { dc }
                }
                [Field(dcs), Instance(dc), Field(field)] if dcs == DCS => Self::DcField { dc, field },
                [Field(dcs), Instance(dc), Field(nss), Instance(ns), Field(name)]
                    if dcs == DCS && nss == DC_NAMESPACES && name == NAME_KEY =>
                {
                    Self::NamespaceIdentity { dc, ns }
                }
                [Field(dcs), Instance(dc), Field(nss), Instance(ns), ..]
                    if dcs == DCS && nss == DC_NAMESPACES =>
                {
                    Self::NamespaceField { dc, ns }
                }
                [Field(dcs), Instance(dc), ..] if dcs == DCS => Self::DcNested { dc },
                _ => Self::Root,
            },
            _ => Self::Outside,
        }
    }
}

/// Changes in application order
#[must_use]
pub fn rearrange(changes: &ChangeSet) -> Vec<(&str, &Change)> {
    let parsed: Vec<(&str, KeyPath, &Change)> = changes
        .iter()
        .map(|(key, change)| (key, KeyPath::parse(key), change))
        .collect();

    let mut deleted_dcs = HashSet::new();
    let mut removed_namespaces = HashSet::new();
    for (_, path, change) in &parsed {
        if !change.has(Operation::Remove) {
            continue;
        }
        match XdrShape::of(path) {
            XdrShape::DcIdentity { dc } => {
                deleted_dcs.insert(dc);
            }
            XdrShape::NamespaceIdentity { dc, ns } => {
                removed_namespaces.insert((dc, ns));
            }
            _ => {}
        }
    }

    let mut buckets: [Vec<(&str, &Change)>; 5] = Default::default();
    for (key, path, change) in &parsed {
        let bucket = match XdrShape::of(path) {
            XdrShape::NamespaceIdentity { .. } if change.has(Operation::Remove) => Some(0),
            XdrShape::NamespaceIdentity { .. } if change.has(Operation::Add) => Some(3),
            XdrShape::DcIdentity { .. }
                if change.has(Operation::Add) || change.has(Operation::Remove) =>
            {
                Some(1)
            }
            XdrShape::DcField { dc, .. } => (!deleted_dcs.contains(dc)).then_some(2),
            XdrShape::DcNested { dc } => (!deleted_dcs.contains(dc)).then_some(4),
            XdrShape::NamespaceField { dc, ns } => {
                (!deleted_dcs.contains(dc) && !removed_namespaces.contains(&(dc, ns))).then_some(4)
            }
            _ => Some(4),
        };
        match bucket {
            Some(i) => buckets[i].push((*key, *change)),
            None => tracing::debug!(%key, "dropping field of removed replication object"),
        }
    }

    buckets.into_iter().flatten().collect()
}
