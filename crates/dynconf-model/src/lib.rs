//! dynconf configuration model
//!
//! Nested configuration trees and their flat-key encoding.
//!
//! # Core Concepts
//!
//! - [`ConfigTree`]: nested configuration document
//! - [`ConfigValue`]: closed union of scalar, string list, section, section list
//! - [`FlatConfig`]: flat key → value map produced by [`flatten`]
//! - [`KeyPath`]: parsed flat key, with `{identity}` instance selectors
//!
//! # Example
//!
//! ```rust
//! use dynconf_model::{expand, flatten, ConfigTree};
//!
//! let tree = ConfigTree::from_yaml(
//!     "namespaces:\n  - name: test\n    replication-factor: 2\n",
//! ).unwrap();
//! let flat = flatten(&tree);
//! assert!(flat.contains_key("namespaces.{test}.replication-factor"));
//! assert_eq!(expand(&flat), tree);
//! ```

#![warn(unreachable_pub)]

mod flat;
mod path;
mod value;
pub mod vocab;

pub use flat::{expand, flatten, without_index_markers, FlatConfig};
pub use path::{split_key, KeyPath, Segment};
pub use value::{ConfigTree, ConfigValue, ModelError, Scalar};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
