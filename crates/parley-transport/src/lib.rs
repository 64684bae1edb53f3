//! Transport abstraction layer for Parley.
//!
//! The chat core speaks a line-oriented protocol and must not care whether
//! a client arrived over a raw TCP stream or a WebSocket. This crate hides
//! that difference behind three traits:
//!
//! - [`Transport`] — a listener that accepts new peers
//! - [`PendingConnection`] — an accepted peer whose protocol upgrade
//!   (if any) has not run yet
//! - [`Connection`] — an established peer that can read one line, write
//!   one line, and close
//!
//! The split between accepting and establishing lets the accept loop hand
//! the (possibly slow) WebSocket upgrade to the per-connection task instead
//! of blocking on it.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

mod error;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use tcp::{PendingTcp, TcpConnection, TcpTransport};
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default upper bound on a single inbound line, in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Counter shared by every transport so ids stay unique across listeners.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming peers.
pub trait Transport: Send + 'static {
    /// The not-yet-established peer produced by [`accept`](Self::accept).
    type Pending: PendingConnection;

    /// Waits for and accepts the next incoming peer.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Pending, TransportError>> + Send;

    /// Returns the address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;

    /// Short name used in logs ("tcp", "websocket").
    fn kind(&self) -> &'static str;
}

/// A peer that has been accepted but not yet upgraded to a [`Connection`].
pub trait PendingConnection: Send + 'static {
    /// The established connection type.
    type Connection: Connection;

    /// The remote address of the peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Completes any protocol upgrade and returns the live connection.
    fn establish(
        self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single established connection that exchanges newline-delimited lines.
///
/// Methods take `&self` so one task can block in [`recv_line`] while
/// another writes. Implementations keep separate locks for the read and
/// write halves.
///
/// [`recv_line`]: Connection::recv_line
pub trait Connection: Send + Sync + 'static {
    /// Writes one logical line and flushes it. The terminator is added by
    /// the transport; `line` must not carry one.
    fn send_line(
        &self,
        line: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reads the next line with its terminator stripped.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    fn recv_line(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the remote address of the peer.
    fn peer_addr(&self) -> SocketAddr;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }
}
