//! dynconf reconciler
//!
//! Compares the configuration an operator wants with what a node runs and
//! produces the administrative commands that converge the two without a
//! restart, or the list of keys that need one.
//!
//! # Core Concepts
//!
//! - [`Reconciler`]: diff → classify → compile over a [`SchemaRegistry`]
//! - [`Plan`]: dynamic command list, or restart-required keys
//! - [`ReconcilerConfig`]: TOML configuration
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dynconf_core::{Plan, Reconciler, ReconcilerConfig};
//! use dynconf_model::ConfigTree;
//! use dynconf_schema::{MemorySource, SchemaRegistry};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {"service": {"type": "object", "properties": {
//!         "proto-fd-max": {"type": "integer", "default": 15000, "dynamic": true}
//!     }}}
//! });
//! let registry = SchemaRegistry::from_source(&MemorySource::new().with("7.0.0", schema)).unwrap();
//! let reconciler = Reconciler::new(Arc::new(registry), ReconcilerConfig::default());
//!
//! let desired = ConfigTree::from_yaml("service:\n  proto-fd-max: 20000\n").unwrap();
//! let current = ConfigTree::from_yaml("service:\n  proto-fd-max: 15000\n").unwrap();
//! let plan = reconciler.plan(&desired, &current, "7.0.0.1", None).unwrap();
//! assert_eq!(plan, Plan::Dynamic {
//!     commands: vec!["set-config:context=service;proto-fd-max=20000".to_string()],
//! });
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod reconciler;

pub use config::{ConfigError, ReconcilerConfig};
pub use error::ReconcileError;
pub use reconciler::{Plan, Reconciler};

pub use dynconf_compile::{InfoSource, StaticInfo};
pub use dynconf_diff::{ChangeSet, DiffReport};
pub use dynconf_model::ConfigTree;
pub use dynconf_schema::SchemaRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
