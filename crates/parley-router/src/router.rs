//! Routing of inbound lines from Active sessions.
//!
//! The router owns no state of its own. It resolves recipients through the
//! [`SessionRegistry`] and [`GroupTable`], queues the rendered lines on the
//! recipients' outbound channels, and records each chat event in the
//! [`HistoryBuffer`] and [`LogSink`].
//!
//! # Ordering
//!
//! History is appended while the registry read lock is held, and the login
//! replay is taken under the registry write lock. A joining session
//! therefore sees every event exactly once: either in its replay or as a
//! live delivery, never both and never neither.

use std::net::SocketAddr;
use std::sync::Arc;

use parley_protocol::{Command, Event, HISTORY_END, HISTORY_START, Reply};
use parley_session::{GroupTable, Outbound, SessionError, SessionRegistry};
use parley_transport::ConnectionId;

use crate::{HistoryBuffer, LogSink};

/// What happened to one routed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Blank line, nothing done.
    Ignored,
    /// Malformed command or unknown target; only the sender was told.
    Rejected,
    /// Broadcast to `delivered` sessions, the sender included.
    Global { delivered: usize },
    /// Delivered to `recipient`.
    Direct { recipient: String },
    /// Delivered to `delivered` online members other than the sender.
    Group { group: String, delivered: usize },
}

/// Routes lines between Active sessions.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<SessionRegistry>,
    groups: Arc<GroupTable>,
    history: Arc<HistoryBuffer>,
    log: Arc<LogSink>,
}

impl Router {
    pub fn new(
        registry: Arc<SessionRegistry>,
        groups: Arc<GroupTable>,
        history: Arc<HistoryBuffer>,
        log: Arc<LogSink>,
    ) -> Self {
        Self {
            registry,
            groups,
            history,
            log,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Most lines [`admit`](Self::admit) queues for a newcomer: the
    /// welcome plus a full replay between its two markers.
    pub fn greeting_len(&self) -> usize {
        self.history.capacity() + 3
    }

    /// Makes a validated session Active.
    ///
    /// On success the session's queue holds, in order, the welcome line and
    /// (if any history exists) the replay block. `outbound` must have room
    /// for [`greeting_len`](Self::greeting_len) lines. Every other Active
    /// session is then told about the join, which is recorded in history and
    /// the log.
    ///
    /// # Errors
    /// [`SessionError::UsernameInUse`] or [`SessionError::ServerFull`] from
    /// the registry. Nothing is queued or recorded in that case.
    pub async fn admit(
        &self,
        id: ConnectionId,
        username: &str,
        peer: SocketAddr,
        outbound: Outbound,
    ) -> Result<(), SessionError> {
        let history = &self.history;
        self.registry.register(id, username, peer, outbound, |out| {
            // The queue is fresh and sized above the replay, so these fit.
            let _ = out.try_send(Reply::Welcome { username }.to_string());
            let lines = history.snapshot();
            if !lines.is_empty() {
                let _ = out.try_send(HISTORY_START.to_string());
                for line in lines {
                    let _ = out.try_send(line);
                }
                let _ = out.try_send(HISTORY_END.to_string());
            }
        })?;

        let event = Event::Joined { username }.to_string();
        self.record(&event, Some(id)).await;
        Ok(())
    }

    /// Removes a session. If it was Active, the remaining sessions are told
    /// it left and the departure is recorded. Returns the freed username.
    ///
    /// Safe to call more than once; only the first call has any effect.
    pub async fn depart(&self, id: ConnectionId) -> Option<String> {
        let username = self.registry.unregister(id)?;
        let event = Event::Left {
            username: &username,
        }
        .to_string();
        self.record(&event, None).await;
        Some(username)
    }

    /// Classifies one inbound line from `sender` and delivers it.
    pub async fn route(
        &self,
        sender_id: ConnectionId,
        sender: &str,
        line: &str,
    ) -> Routed {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Routed::Ignored,
            Err(e) => {
                tracing::debug!(%sender_id, sender, error = %e, "malformed command");
                self.reply(sender_id, &Reply::Invalid(e));
                return Routed::Rejected;
            }
        };

        match command {
            Command::Global { text } => {
                let event = Event::Global { sender, text }.to_string();
                let delivered = self.record(&event, None).await;
                Routed::Global { delivered }
            }
            Command::Direct { recipient, text } => {
                self.route_direct(sender_id, sender, recipient, text).await
            }
            Command::Group { group, text } => {
                self.route_group(sender_id, sender, group, text).await
            }
        }
    }

    async fn route_direct(
        &self,
        sender_id: ConnectionId,
        sender: &str,
        recipient: &str,
        text: &str,
    ) -> Routed {
        let event = Event::Direct {
            sender,
            recipient,
            text,
        }
        .to_string();
        {
            let sessions = self.registry.read();
            let Some(recipient_id) = sessions.find(recipient) else {
                sessions.send(
                    sender_id,
                    &Reply::UserNotFound {
                        username: recipient,
                    }
                    .to_string(),
                );
                return Routed::Rejected;
            };
            sessions.send(
                recipient_id,
                &Reply::DirectFrom { sender, text }.to_string(),
            );
            sessions.send(
                sender_id,
                &Reply::DirectTo { recipient, text }.to_string(),
            );
            self.history.append(&event);
        }
        self.log.append(&event).await;
        tracing::debug!(%sender_id, sender, recipient, "direct message delivered");
        Routed::Direct {
            recipient: recipient.to_string(),
        }
    }

    async fn route_group(
        &self,
        sender_id: ConnectionId,
        sender: &str,
        group_name: &str,
        text: &str,
    ) -> Routed {
        let Some(group) = self.groups.get(group_name) else {
            self.reply(sender_id, &Reply::GroupNotFound { group: group_name });
            return Routed::Rejected;
        };
        let event = Event::Group {
            group: group.name(),
            sender,
            text,
        }
        .to_string();

        let delivered = {
            let sessions = self.registry.read();
            let line = Reply::GroupFrom {
                group: group.name(),
                sender,
                text,
            }
            .to_string();
            let delivered = group
                .members()
                .iter()
                .filter_map(|member| sessions.find(member))
                .filter(|id| *id != sender_id)
                .filter(|id| sessions.send(*id, &line))
                .count();
            sessions.send(
                sender_id,
                &Reply::GroupTo {
                    group: group.name(),
                    text,
                }
                .to_string(),
            );
            self.history.append(&event);
            delivered
        };
        self.log.append(&event).await;
        tracing::info!(
            %sender_id,
            sender,
            group = group.name(),
            delivered,
            "group message delivered"
        );
        Routed::Group {
            group: group.name().to_string(),
            delivered,
        }
    }

    /// Broadcasts `event` to every Active session except `exclude`, appends
    /// it to history under the same read lock, then writes it to the log.
    async fn record(&self, event: &str, exclude: Option<ConnectionId>) -> usize {
        let delivered = {
            let sessions = self.registry.read();
            let delivered = sessions.broadcast(event, exclude);
            self.history.append(event);
            delivered
        };
        self.log.append(event).await;
        delivered
    }

    /// Sends a line to the sender only. Not recorded anywhere.
    fn reply(&self, id: ConnectionId, reply: &Reply<'_>) {
        self.registry.read().send(id, &reply.to_string());
    }
}

#[cfg(test)]
mod tests {
    use parley_session::{
        DEFAULT_OUTBOUND_CAPACITY, Group, OutboundReceiver, outbound_channel,
    };

    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:6000".parse().unwrap()
    }

    fn router() -> Router {
        Router::new(
            Arc::new(SessionRegistry::new(None)),
            Arc::new(GroupTable::new([Group::new("team", ["a", "b"])])),
            Arc::new(HistoryBuffer::new(20)),
            Arc::new(LogSink::from_writer(tokio::io::sink())),
        )
    }

    async fn admit(router: &Router, n: u64, name: &str) -> OutboundReceiver {
        let (tx, rx) = outbound_channel(DEFAULT_OUTBOUND_CAPACITY);
        router
            .admit(ConnectionId::new(n), name, addr(), tx)
            .await
            .unwrap();
        rx
    }

    fn drain(rx: &mut OutboundReceiver) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_admit_first_session_gets_welcome_only() {
        let router = router();
        let mut a = admit(&router, 1, "a").await;
        assert_eq!(drain(&mut a), ["Welcome, a!"]);
        assert_eq!(router.history().snapshot(), ["System: a has joined the chat."]);
    }

    #[tokio::test]
    async fn test_admit_replays_history_between_markers() {
        let router = router();
        let _a = admit(&router, 1, "a").await;
        router.route(ConnectionId::new(1), "a", "hello").await;

        let mut b = admit(&router, 2, "b").await;
        assert_eq!(
            drain(&mut b),
            [
                "Welcome, b!",
                HISTORY_START,
                "System: a has joined the chat.",
                "a: hello",
                HISTORY_END,
            ]
        );
    }

    #[tokio::test]
    async fn test_admit_duplicate_records_nothing() {
        let router = router();
        let _a = admit(&router, 1, "a").await;
        let (tx, mut rx) = outbound_channel(DEFAULT_OUTBOUND_CAPACITY);
        let result = router.admit(ConnectionId::new(2), "a", addr(), tx).await;

        assert!(matches!(result, Err(SessionError::UsernameInUse(_))));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(router.history().len(), 1);
    }

    #[tokio::test]
    async fn test_route_blank_line_is_ignored() {
        let router = router();
        let mut a = admit(&router, 1, "a").await;
        drain(&mut a);
        assert_eq!(router.route(ConnectionId::new(1), "a", "   ").await, Routed::Ignored);
        assert!(drain(&mut a).is_empty());
    }

    #[tokio::test]
    async fn test_route_malformed_dm_replies_to_sender_only() {
        let router = router();
        let mut a = admit(&router, 1, "a").await;
        let mut b = admit(&router, 2, "b").await;
        drain(&mut a);
        drain(&mut b);
        let before = router.history().len();

        let routed = router.route(ConnectionId::new(1), "a", "PRIVMSG b").await;

        assert_eq!(routed, Routed::Rejected);
        assert_eq!(
            drain(&mut a),
            ["System: Invalid DM format. Use: PRIVMSG <user> <message>"]
        );
        assert!(drain(&mut b).is_empty());
        assert_eq!(router.history().len(), before);
    }

    #[tokio::test]
    async fn test_route_unknown_group_replies_to_sender_only() {
        let router = router();
        let mut a = admit(&router, 1, "a").await;
        drain(&mut a);

        let routed = router.route(ConnectionId::new(1), "a", "GROUPMSG nope hi").await;

        assert_eq!(routed, Routed::Rejected);
        assert_eq!(drain(&mut a), ["System: Group '#nope' not found."]);
    }

    #[tokio::test]
    async fn test_depart_twice_only_announces_once() {
        let router = router();
        let _a = admit(&router, 1, "a").await;
        let mut b = admit(&router, 2, "b").await;
        drain(&mut b);

        assert_eq!(router.depart(ConnectionId::new(1)).await.as_deref(), Some("a"));
        assert_eq!(router.depart(ConnectionId::new(1)).await, None);
        assert_eq!(drain(&mut b), ["System: a has left the chat."]);
    }
}
