//! Session types: the server's record of one connected client.
//!
//! A session tracks:
//! - WHICH connection it belongs to (`ConnectionId`, peer address)
//! - WHO the client is once the handshake completes (username)
//! - WHERE it is in its lifecycle (`SessionState`)

use std::fmt;
use std::net::SocketAddr;

use parley_transport::ConnectionId;

use crate::{AllowList, SessionError};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Limits applied during the handshake and when loading the allow-list
/// and group table.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Usernames must be strictly shorter than this many bytes.
    pub username_max_len: usize,

    /// Group names must be strictly shorter than this many bytes.
    pub group_name_max_len: usize,

    /// Maximum number of concurrently Active sessions. `None` = unlimited.
    pub max_sessions: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username_max_len: 50,
            group_name_max_len: 50,
            max_sessions: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
/// Pending → AwaitingUsername → Active → Closed
///              │                           ↑
///              └───────(rejected)──────────┘
/// ```
///
/// - **Pending**: connected, nothing sent yet.
/// - **AwaitingUsername**: `REQ_USERNAME` sent, waiting for the reply.
/// - **Active**: registered; routes commands and receives deliveries.
/// - **Closed**: terminal. Reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    AwaitingUsername,
    Active,
    Closed,
}

impl SessionState {
    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::AwaitingUsername)
                | (Self::AwaitingUsername, Self::Active)
                | (Self::Pending | Self::AwaitingUsername | Self::Active, Self::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::AwaitingUsername => write!(f, "AwaitingUsername"),
            Self::Active => write!(f, "Active"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single client's session.
///
/// The username is set exactly once, on the transition to `Active`.
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    username: Option<String>,
    state: SessionState,
}

impl Session {
    /// Creates a session in the `Pending` state.
    pub fn new(id: ConnectionId, peer: SocketAddr) -> Self {
        Self {
            id,
            peer,
            username: None,
            state: SessionState::Pending,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The username, once the session has been Active.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// `Pending → AwaitingUsername`, after `REQ_USERNAME` is sent.
    pub fn await_username(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::AwaitingUsername)
    }

    /// `AwaitingUsername → Active`, binding the username for good.
    pub fn activate(&mut self, username: String) -> Result<(), SessionError> {
        self.transition(SessionState::Active)?;
        self.username = Some(username);
        Ok(())
    }

    /// Moves to `Closed`. Returns `true` if the session was Active, i.e.
    /// a departure has to be announced.
    pub fn close(&mut self) -> bool {
        let was_active = self.state == SessionState::Active;
        self.state = SessionState::Closed;
        was_active
    }

    fn transition(&mut self, to: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

/// Validates the line a client sent in reply to `REQ_USERNAME`.
///
/// Checks, in order: empty, too long, not on the allow-list. Uniqueness
/// among Active sessions is checked later, atomically, by
/// [`SessionRegistry::register`](crate::SessionRegistry::register).
///
/// Returns the trimmed username.
pub fn check_username<'a>(
    line: &'a str,
    allow_list: &AllowList,
    config: &SessionConfig,
) -> Result<&'a str, SessionError> {
    let username = line.trim();
    if username.is_empty() {
        return Err(SessionError::EmptyUsername);
    }
    if username.len() >= config.username_max_len {
        return Err(SessionError::UsernameTooLong {
            len: username.len(),
            max: config.username_max_len,
        });
    }
    if !allow_list.contains(username) {
        return Err(SessionError::NotAllowed(username.to_string()));
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(ConnectionId::new(1), "127.0.0.1:4000".parse().unwrap())
    }

    fn allow(names: &[&str]) -> AllowList {
        AllowList::new(names.iter().copied())
    }

    #[test]
    fn test_new_session_is_pending_without_username() {
        let s = session();
        assert_eq!(s.state(), SessionState::Pending);
        assert!(s.username().is_none());
    }

    #[test]
    fn test_full_lifecycle_sets_username_once() {
        let mut s = session();
        s.await_username().unwrap();
        s.activate("alice".into()).unwrap();
        assert_eq!(s.state(), SessionState::Active);
        assert_eq!(s.username(), Some("alice"));

        // A second activation would rename the session; refuse it.
        let result = s.activate("mallory".into());
        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition { .. })
        ));
        assert_eq!(s.username(), Some("alice"));
    }

    #[test]
    fn test_activate_from_pending_is_rejected() {
        let mut s = session();
        assert!(s.activate("alice".into()).is_err());
        assert_eq!(s.state(), SessionState::Pending);
    }

    #[test]
    fn test_close_reports_whether_active() {
        let mut handshaking = session();
        handshaking.await_username().unwrap();
        assert!(!handshaking.close());
        assert_eq!(handshaking.state(), SessionState::Closed);

        let mut active = session();
        active.await_username().unwrap();
        active.activate("alice".into()).unwrap();
        assert!(active.close());
    }

    #[test]
    fn test_closed_is_terminal() {
        assert!(!SessionState::Closed.can_transition_to(SessionState::Active));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Pending));
        assert!(!SessionState::Active.can_transition_to(SessionState::Pending));
    }

    #[test]
    fn test_check_username_accepts_allowed_name() {
        let list = allow(&["alice"]);
        let name = check_username(" alice ", &list, &SessionConfig::default());
        assert_eq!(name.unwrap(), "alice");
    }

    #[test]
    fn test_check_username_rejects_empty() {
        let list = allow(&["alice"]);
        let result = check_username("   ", &list, &SessionConfig::default());
        assert!(matches!(result, Err(SessionError::EmptyUsername)));
    }

    #[test]
    fn test_check_username_rejects_at_limit() {
        let config = SessionConfig {
            username_max_len: 5,
            ..SessionConfig::default()
        };
        let list = allow(&["abcd", "abcde"]);
        assert!(check_username("abcd", &list, &config).is_ok());
        assert!(matches!(
            check_username("abcde", &list, &config),
            Err(SessionError::UsernameTooLong { len: 5, max: 5 })
        ));
    }

    #[test]
    fn test_check_username_rejects_unlisted_name() {
        let list = allow(&["alice"]);
        let result = check_username("bob", &list, &SessionConfig::default());
        assert!(matches!(result, Err(SessionError::NotAllowed(n)) if n == "bob"));
    }

    #[test]
    fn test_check_username_is_case_sensitive() {
        let list = allow(&["alice"]);
        assert!(check_username("Alice", &list, &SessionConfig::default()).is_err());
    }
}
