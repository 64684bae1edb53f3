//! Error types for the protocol layer.
//!
//! Protocol errors are recoverable: the router turns each one into a
//! `System:` line for the sender and the session carries on.

/// A command keyword was recognised but its arguments were not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// `PRIVMSG` without both a recipient and message text.
    #[error("invalid DM format")]
    InvalidDirect,

    /// `GROUPMSG` without both a group name and message text.
    #[error("invalid group message format")]
    InvalidGroup,
}
