//! Per-connection handler: handshake, routing loop, and cleanup.
//!
//! Each accepted peer gets its own Tokio task running this handler.
//! The flow is:
//!   1. Establish the transport (WebSocket upgrade if any)
//!   2. Refuse with `SERVER_FULL` if the server is at capacity
//!   3. Send `REQ_USERNAME`, validate the reply, register the session
//!   4. Loop: read lines → route them
//!   5. Deregister and announce the departure
//!
//! Writes to an Active session go through its outbound queue and a
//! dedicated writer task, so routing from other sessions never waits on
//! this peer's socket.

use std::sync::Arc;
use std::time::Duration;

use parley_protocol::{REQ_USERNAME, Rejection};
use parley_router::Router;
use parley_session::{
    OutboundReceiver, Session, SessionError, check_username, outbound_channel,
};
use parley_transport::{
    Connection, ConnectionId, PendingConnection, TransportError,
};

use crate::ParleyError;
use crate::server::ServerState;

/// How long a rejected peer's unread input is drained after the reply, so
/// the close does not reset the connection before the reply is read.
const REJECT_LINGER: Duration = Duration::from_secs(1);

/// Drop guard that deregisters an Active session when the handler exits.
///
/// The normal path calls [`depart`](Self::depart) and awaits it. If the
/// handler unwinds or is cancelled first, `Drop` spawns the same cleanup.
struct DepartGuard {
    conn_id: ConnectionId,
    router: Option<Router>,
}

impl DepartGuard {
    async fn depart(mut self) {
        if let Some(router) = self.router.take() {
            router.depart(self.conn_id).await;
        }
    }
}

impl Drop for DepartGuard {
    fn drop(&mut self) {
        if let Some(router) = self.router.take() {
            let conn_id = self.conn_id;
            tokio::spawn(async move {
                router.depart(conn_id).await;
            });
        }
    }
}

/// Handles a single peer from accept to close.
pub(crate) async fn handle_connection<P: PendingConnection>(
    pending: P,
    state: Arc<ServerState>,
) -> Result<(), ParleyError> {
    let peer = pending.peer_addr();
    let conn = Arc::new(pending.establish().await?);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let mut session = Session::new(conn_id, peer);

    if state.router.registry().is_full() {
        tracing::info!(%conn_id, %peer, "server full, refusing connection");
        reject(conn.as_ref(), Rejection::ServerFull).await;
        return Ok(());
    }

    // --- Step 1: Handshake ---
    conn.send_line(REQ_USERNAME).await?;
    session.await_username()?;

    let line = match conn.recv_line().await {
        Ok(Some(line)) => line,
        Ok(None) => {
            tracing::debug!(%conn_id, "closed before sending a username");
            return Ok(());
        }
        Err(TransportError::LineTooLong(max)) => {
            tracing::info!(
                %conn_id,
                %peer,
                max,
                "handshake rejected, username line too long"
            );
            reject(conn.as_ref(), Rejection::UsernameTooLong).await;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let (outbound, receiver) = outbound_channel(state.outbound_capacity);
    let admitted = match check_username(
        &line,
        &state.allow_list,
        &state.session_config,
    ) {
        Ok(username) => state
            .router
            .admit(conn_id, username, peer, outbound)
            .await
            .map(|()| username.to_string()),
        Err(e) => Err(e),
    };
    let username = match admitted {
        Ok(username) => username,
        Err(e) => {
            tracing::info!(%conn_id, %peer, reason = %e, "handshake rejected");
            if let Some(rejection) = e.rejection() {
                reject(conn.as_ref(), rejection).await;
            }
            return match e {
                SessionError::InvalidTransition { .. } => Err(e.into()),
                _ => Ok(()),
            };
        }
    };

    let guard = DepartGuard {
        conn_id,
        router: Some(state.router.clone()),
    };
    session.activate(username.clone())?;
    let writer = tokio::spawn(write_lines(Arc::clone(&conn), receiver));
    tracing::info!(%conn_id, %peer, username, "session active");

    // --- Step 2: Message loop ---
    loop {
        let line = match conn.recv_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(%conn_id, username, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, username, error = %e, "recv error");
                break;
            }
        };
        state.router.route(conn_id, &username, &line).await;
    }

    // --- Step 3: Cleanup ---
    session.close();
    guard.depart().await;
    tracing::info!(
        conn_id = %session.id(),
        peer = %session.peer(),
        username = ?session.username(),
        "session closed"
    );
    // Deregistering dropped the last sender, so the writer drains what is
    // left and closes the connection.
    if let Err(e) = writer.await {
        tracing::error!(%conn_id, error = %e, "writer task failed");
    }
    Ok(())
}

/// Drains a session's outbound queue onto its connection, then closes it.
async fn write_lines<C: Connection>(conn: Arc<C>, mut receiver: OutboundReceiver) {
    while let Some(line) = receiver.recv().await {
        if let Err(e) = conn.send_line(&line).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, writer stopping");
            break;
        }
    }
    let _ = conn.close().await;
}

/// Sends a rejection, one line at a time, and closes the connection.
///
/// Input the peer already sent is then read and discarded until it hangs
/// up or [`REJECT_LINGER`] passes.
async fn reject<C: Connection>(conn: &C, rejection: Rejection) {
    for line in rejection.to_string().lines() {
        if conn.send_line(line).await.is_err() {
            break;
        }
    }
    let _ = conn.close().await;
    let _ = tokio::time::timeout(REJECT_LINGER, async {
        loop {
            match conn.recv_line().await {
                Ok(Some(_))
                | Err(
                    TransportError::LineTooLong(_)
                    | TransportError::EmbeddedTerminator,
                ) => continue,
                Ok(None) | Err(_) => break,
            }
        }
    })
    .await;
}
