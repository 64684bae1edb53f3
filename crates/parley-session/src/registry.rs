//! The registry of Active sessions: the single source of truth for who is
//! online.
//!
//! # Concurrency
//!
//! One `RwLock` guards the map. Register and unregister take it
//! exclusively; lookups and broadcasts go through [`SessionRegistry::read`],
//! which holds it shared for as long as the returned [`ActiveSessions`]
//! view lives. Deliveries are non-blocking `mpsc` sends, so no guard is
//! ever held across network I/O, and a session removed under the write
//! lock can never be handed a line by a later reader.
//!
//! Outbound queues are bounded. A peer that stops reading loses lines once
//! its queue is full; the loss is logged and the session stays registered.
//!
//! Callers that also touch the history buffer take the registry lock first.

use std::collections::HashMap;
use std::net::SocketAddr;

use parking_lot::{RwLock, RwLockReadGuard};
use parley_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::SessionError;

/// Default number of lines a session's outbound queue holds.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1024;

/// Sending half of a session's outbound line queue. Its writer task is the
/// only thing that writes to the session's transport.
pub type Outbound = mpsc::Sender<String>;

/// Receiving half of a session's outbound line queue.
pub type OutboundReceiver = mpsc::Receiver<String>;

/// Creates the outbound queue for a new session, holding at most
/// `capacity` undelivered lines.
pub fn outbound_channel(capacity: usize) -> (Outbound, OutboundReceiver) {
    mpsc::channel(capacity.max(1))
}

#[derive(Debug)]
struct Entry {
    username: String,
    peer: SocketAddr,
    outbound: Outbound,
}

/// Active sessions keyed by connection identity.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ConnectionId, Entry>>,
    max_sessions: Option<usize>,
}

impl SessionRegistry {
    /// Creates an empty registry. `max_sessions` caps the number of Active
    /// sessions; `None` means unlimited.
    pub fn new(max_sessions: Option<usize>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Adds an Active session.
    ///
    /// Uniqueness of the username and the capacity limit are checked under
    /// the same exclusive lock as the insert, so two concurrent handshakes
    /// for one name cannot both succeed. `greet` runs while that lock is
    /// still held, before any other session can see the newcomer; lines it
    /// queues on the outbound channel therefore precede every delivery
    /// routed to the new session.
    ///
    /// # Errors
    /// - [`SessionError::UsernameInUse`] if an Active session has the name
    /// - [`SessionError::ServerFull`] if the capacity limit is reached
    pub fn register(
        &self,
        id: ConnectionId,
        username: &str,
        peer: SocketAddr,
        outbound: Outbound,
        greet: impl FnOnce(&Outbound),
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();

        if sessions.values().any(|e| e.username == username) {
            return Err(SessionError::UsernameInUse(username.to_string()));
        }
        if let Some(max) = self.max_sessions {
            if sessions.len() >= max {
                return Err(SessionError::ServerFull(max));
            }
        }

        greet(&outbound);
        sessions.insert(
            id,
            Entry {
                username: username.to_string(),
                peer,
                outbound,
            },
        );
        tracing::info!(%id, %peer, username, "session registered");
        Ok(())
    }

    /// Removes a session, returning its username if it was registered.
    pub fn unregister(&self, id: ConnectionId) -> Option<String> {
        let entry = self.sessions.write().remove(&id)?;
        tracing::info!(%id, peer = %entry.peer, username = %entry.username, "session unregistered");
        Some(entry.username)
    }

    /// Takes the shared lock and returns a view of the Active sessions.
    ///
    /// The view is a consistent snapshot: no session is added or removed
    /// while it is alive. Keep it short-lived and never hold it across an
    /// `.await`.
    pub fn read(&self) -> ActiveSessions<'_> {
        ActiveSessions {
            sessions: self.sessions.read(),
        }
    }

    /// Returns `true` if the capacity limit is already reached.
    pub fn is_full(&self) -> bool {
        self.max_sessions
            .is_some_and(|max| self.sessions.read().len() >= max)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

/// A shared-locked view of the registry used for routing.
pub struct ActiveSessions<'a> {
    sessions: RwLockReadGuard<'a, HashMap<ConnectionId, Entry>>,
}

impl ActiveSessions<'_> {
    /// Finds the Active session using `username`.
    pub fn find(&self, username: &str) -> Option<ConnectionId> {
        self.sessions
            .iter()
            .find(|(_, e)| e.username == username)
            .map(|(id, _)| *id)
    }

    /// Queues `line` for one session. Returns `false` if the session is not
    /// registered, its queue is full, or its writer has stopped. The last
    /// two are logged and the session stays registered.
    pub fn send(&self, id: ConnectionId, line: &str) -> bool {
        match self.sessions.get(&id) {
            Some(entry) => deliver(id, entry, line),
            None => false,
        }
    }

    /// Queues `line` for every Active session except `exclude`. Returns the
    /// number of sessions it was queued for.
    pub fn broadcast(&self, line: &str, exclude: Option<ConnectionId>) -> usize {
        self.sessions
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .filter(|(id, entry)| deliver(**id, entry, line))
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn deliver(id: ConnectionId, entry: &Entry, line: &str) -> bool {
    match entry.outbound.try_send(line.to_string()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                %id,
                username = %entry.username,
                "outbound queue full, line dropped"
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::warn!(
                %id,
                username = %entry.username,
                "delivery failed, writer has stopped"
            );
            false
        }
    }
}
