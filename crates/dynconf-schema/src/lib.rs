//! dynconf schema registry
//!
//! Loads one JSON schema document per server version and derives the
//! catalog the reconciler needs from it.
//!
//! # Core Concepts
//!
//! - [`SchemaRegistry`]: immutable per-version catalog
//! - [`SchemaEntry`]: defaults, dynamic fields and required sets of one version
//! - [`SchemaSource`]: where documents come from ([`DirSource`], [`MemorySource`])
//! - [`base_version`]: `7.0.0.5` → `7.0.0`
//!
//! # Example
//!
//! ```rust
//! use dynconf_schema::{MemorySource, SchemaRegistry};
//! use serde_json::json;
//!
//! let source = MemorySource::new().with("7.0.0", json!({
//!     "properties": {"service": {"properties": {
//!         "proto-fd-max": {"type": "integer", "default": 15000, "dynamic": true}
//!     }}}
//! }));
//! let registry = SchemaRegistry::from_source(&source).unwrap();
//! assert!(registry.dynamic_fields("7.0.0.5").unwrap().contains("service.proto-fd-max"));
//! ```

#![warn(unreachable_pub)]

mod error;
mod flatten;
mod registry;
mod source;
mod version;

pub use error::{SchemaError, ValidationIssue};
pub use registry::{SchemaEntry, SchemaRegistry};
pub use source::{DirSource, MemorySource, SchemaSource};
pub use version::base_version;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
