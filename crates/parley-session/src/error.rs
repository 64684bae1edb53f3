//! Error types for the session layer.

use parley_protocol::Rejection;

use crate::SessionState;

/// Errors that can occur during the handshake and session bookkeeping.
///
/// Every variant except [`InvalidTransition`](Self::InvalidTransition)
/// ends the handshake and maps to a reply line through
/// [`rejection`](Self::rejection).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The client sent an empty username line.
    #[error("username is empty")]
    EmptyUsername,

    /// The username reached the configured maximum length.
    #[error("username is {len} bytes, limit is below {max}")]
    UsernameTooLong { len: usize, max: usize },

    /// The username is not on the allow-list.
    #[error("username '{0}' is not on the allow-list")]
    NotAllowed(String),

    /// Another Active session already uses this username.
    #[error("username '{0}' is already in use")]
    UsernameInUse(String),

    /// The configured maximum of Active sessions is reached.
    #[error("server is full ({0} active sessions)")]
    ServerFull(usize),

    /// A state change the session state machine does not allow.
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

impl SessionError {
    /// The line to send the client before closing, if any.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::EmptyUsername => Some(Rejection::EmptyUsername),
            Self::UsernameTooLong { .. } => Some(Rejection::UsernameTooLong),
            Self::NotAllowed(_) => Some(Rejection::NotAllowed),
            Self::UsernameInUse(_) => Some(Rejection::UsernameInUse),
            Self::ServerFull(_) => Some(Rejection::ServerFull),
            Self::InvalidTransition { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_maps_handshake_errors() {
        assert_eq!(
            SessionError::NotAllowed("bob".into()).rejection(),
            Some(Rejection::NotAllowed)
        );
        assert_eq!(
            SessionError::UsernameInUse("alice".into()).rejection(),
            Some(Rejection::UsernameInUse)
        );
        assert_eq!(
            SessionError::ServerFull(3).rejection(),
            Some(Rejection::ServerFull)
        );
    }

    #[test]
    fn test_rejection_none_for_internal_errors() {
        let err = SessionError::InvalidTransition {
            from: SessionState::Closed,
            to: SessionState::Active,
        };
        assert_eq!(err.rejection(), None);
        assert!(err.to_string().contains("Closed"));
    }
}
