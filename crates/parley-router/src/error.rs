//! Error types for the routing layer.

/// Errors from the durable chat log.
///
/// Routing itself never fails: protocol problems become `System:` replies.
/// Only the log can fail, and after startup those failures are reported to
/// the operator rather than propagated.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The chat log file could not be opened.
    #[error("could not open chat log {path}: {source}")]
    LogOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Appending to the chat log failed.
    #[error("chat log write failed: {0}")]
    LogWrite(#[source] std::io::Error),
}
