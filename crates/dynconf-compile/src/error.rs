//! Error types for command compilation

/// Errors from the live-node info capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InfoError {
    /// Node rejected or failed the command
    #[error("info command '{command}' failed: {message}")]
    Failed { command: String, message: String },

    /// Source has no answer for the command
    #[error("no response for info command '{0}'")]
    NoResponse(String),
}

/// Errors from command compilation
///
/// Any error aborts the whole batch; no partial command list is returned.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Value kind has no command form
    #[error("cannot compile {kind} value of '{key}' into a command")]
    TransformUnsupported { key: String, kind: &'static str },

    /// Logging changes present but no info source supplied
    #[error("logging changes need a live info source to resolve sink ids")]
    MissingInfoSource,

    /// Sink name not reported by the node
    #[error("log sink '{0}' not found on node")]
    UnknownLogSink(String),

    /// Info lookup failed
    #[error("info lookup failed: {0}")]
    Info(#[from] InfoError),

    /// Key lacks the structure its context requires
    #[error("malformed configuration key '{0}'")]
    MalformedKey(String),
}

impl CompileError {
    /// Create malformed-key error
    pub fn malformed(key: impl Into<String>) -> Self {
        Self::MalformedKey(key.into())
    }
}
