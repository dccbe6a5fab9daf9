//! dynconf command compiler
//!
//! Turns a [`ChangeSet`] into the ordered administrative commands a running
//! node applies without restart.
//!
//! # Core Concepts
//!
//! - [`compile`]: change-set → ordered command list, all or nothing
//! - [`rearrange`]: dependency ordering of replication objects
//! - [`InfoSource`]: live-node lookups (log sink ids); [`StaticInfo`] offline
//!
//! # Example
//!
//! ```rust
//! use dynconf_compile::compile;
//! use dynconf_diff::{Change, ChangeSet};
//!
//! let changes = ChangeSet::new()
//!     .with("service.proto-fd-max", Change::update(20000_u64))
//!     .with("namespaces.{test}.default-ttl", Change::update(3600_u64));
//! let commands = compile(&changes, None).unwrap();
//! assert_eq!(commands, vec![
//!     "set-config:context=namespace;id=test;default-ttl=3600",
//!     "set-config:context=service;proto-fd-max=20000",
//! ]);
//! ```

#![warn(unreachable_pub)]

mod command;
mod error;
mod info;
mod order;

pub use error::{CompileError, InfoError};
pub use info::{node_sink_name, InfoSource, StaticInfo, LOGS_COMMAND};
pub use order::rearrange;

use dynconf_diff::ChangeSet;

use crate::command::Synthesizer;

/// Compile a change-set into ordered commands
///
/// `info` is consulted once, and only if the change-set touches the logging
/// context.
///
/// # Errors
/// Any error aborts the whole batch: unsupported value kinds, malformed
/// keys, or a failed or missing log sink lookup
pub fn compile(changes: &ChangeSet, info: Option<&dyn InfoSource>) -> Result<Vec<String>, CompileError> {
    let mut synth = Synthesizer::new(info);
    let mut commands = Vec::new();
    for (key, change) in rearrange(changes) {
        commands.extend(synth.commands(key, change)?);
    }
    tracing::debug!(changes = changes.len(), commands = commands.len(), "compiled change-set");
    Ok(commands)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
