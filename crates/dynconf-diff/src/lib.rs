//! dynconf diff engine and dynamic-safety classifier
//!
//! Turns a desired and a current flat configuration into a [`ChangeSet`],
//! then decides whether that change-set can be applied to a live node.
//!
//! # Core Concepts
//!
//! - [`Change`]: update, or add/remove set edit, for one flat key
//! - [`ChangeSet`]: sorted flat key → change map
//! - [`reconcile`] / [`diff`]: two-pass directional diff
//! - [`is_all_dynamic`] / [`non_dynamic_keys`]: fail-closed classification
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use dynconf_diff::{diff, Change, DiffOptions};
//! use dynconf_model::{flatten, ConfigTree};
//!
//! let desired = flatten(&ConfigTree::from_yaml("service:\n  proto-fd-max: 20000\n").unwrap());
//! let current = flatten(&ConfigTree::from_yaml("service:\n  proto-fd-max: 15000\n").unwrap());
//! let report = diff(&desired, &current, &BTreeMap::new(), DiffOptions::default());
//! assert_eq!(report.changes.get("service.proto-fd-max"), Some(&Change::update(20000_u64)));
//! ```

#![warn(unreachable_pub)]

mod change;
mod diff;
mod dynamic;
mod error;

pub use change::{Change, ChangeSet, Operation, SetEdit};
pub use diff::{diff, diff_with_registry, is_identity_key, reconcile, DiffOptions, DiffReport};
pub use dynamic::{classify, is_all_dynamic, non_dynamic_keys, Rejection};
pub use error::DiffError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
