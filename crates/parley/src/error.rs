//! Unified error type for the Parley server.

use parley_router::RouterError;
use parley_session::SessionError;
use parley_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A handshake or session bookkeeping error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A chat log error.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::LineTooLong(4096);
        let parley_err: ParleyError = err.into();
        assert!(matches!(parley_err, ParleyError::Transport(_)));
        assert!(parley_err.to_string().contains("4096"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotAllowed("mallory".into());
        let parley_err: ParleyError = err.into();
        assert!(matches!(parley_err, ParleyError::Session(_)));
        assert!(parley_err.to_string().contains("mallory"));
    }

    #[test]
    fn test_from_router_error() {
        let err = RouterError::LogWrite(std::io::Error::other("disk full"));
        let parley_err: ParleyError = err.into();
        assert!(matches!(parley_err, ParleyError::Router(_)));
    }

    #[test]
    fn test_from_toml_error() {
        let err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let parley_err: ParleyError = err.into();
        assert!(parley_err.to_string().starts_with("invalid configuration"));
    }
}
