//! Live-node info capability
//!
//! The compiler never talks to a node itself. It asks an [`InfoSource`] for
//! the few facts only the node knows, currently the numeric ids of its log
//! sinks.

use std::collections::HashMap;

use crate::error::{CompileError, InfoError};

/// Info command listing a node's log sinks as `id → name`
pub const LOGS_COMMAND: &str = "logs";

/// Sink name configured as `console` but reported by the node as `stderr`
const CONSOLE_SINK: &str = "console";
const STDERR_SINK: &str = "stderr";

/// Runs info commands against one node
#[cfg_attr(test, mockall::automock)]
pub trait InfoSource {
    /// Run an info command
    ///
    /// # Errors
    /// Returns error if the node cannot answer
    fn run_info(&self, command: &str) -> Result<HashMap<String, String>, InfoError>;
}

/// Fixed responses, for offline planning and tests
#[derive(Debug, Clone, Default)]
pub struct StaticInfo {
    responses: HashMap<String, HashMap<String, String>>,
}

impl StaticInfo {
    /// Create source with no responses
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `response`
    #[must_use]
    pub fn with_response<K, V>(
        mut self,
        command: impl Into<String>,
        response: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let response = response
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.responses.insert(command.into(), response);
        self
    }

    /// Answer the sink listing with `(id, name)` pairs
    #[must_use]
    pub fn with_log_sinks<K, V>(self, sinks: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.with_response(LOGS_COMMAND, sinks)
    }
}

impl InfoSource for StaticInfo {
    fn run_info(&self, command: &str) -> Result<HashMap<String, String>, InfoError> {
        self.responses
            .get(command)
            .cloned()
            .ok_or_else(|| InfoError::NoResponse(command.to_string()))
    }
}

/// Name the node uses for a configured sink
#[inline]
#[must_use]
pub fn node_sink_name(configured: &str) -> &str {
    if configured == CONSOLE_SINK {
        STDERR_SINK
    } else {
        configured
    }
}

/// Sink name → numeric id, from one sink listing
pub(crate) fn log_sink_ids(info: &dyn InfoSource) -> Result<HashMap<String, String>, CompileError> {
    let sinks = info.run_info(LOGS_COMMAND)?;
    tracing::debug!(sinks = sinks.len(), "resolved node log sinks");
    Ok(sinks.into_iter().map(|(id, name)| (name, id)).collect())
}
