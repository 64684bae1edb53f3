//! `ChatServer` builder and accept loops.
//!
//! This is the entry point for running a Parley server. It ties together
//! all the layers: transport → session → router.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parley_router::{HistoryBuffer, LogSink, Router};
use parley_session::{AllowList, GroupTable, SessionConfig, SessionRegistry};
use parley_transport::{TcpTransport, Transport, WebSocketTransport};
use tokio::task::JoinSet;

use crate::handler::handle_connection;
use crate::{ParleyError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) router: Router,
    pub(crate) allow_list: AllowList,
    pub(crate) session_config: SessionConfig,
    /// Bound on each session's outbound queue.
    pub(crate) outbound_capacity: usize,
}

/// Builder for configuring and starting a Parley server.
///
/// # Example
///
/// ```rust,ignore
/// use parley::prelude::*;
///
/// let server = ChatServer::builder()
///     .tcp_addr("0.0.0.0:8080")
///     .ws_addr("0.0.0.0:8081")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct ChatServerBuilder {
    config: ServerConfig,
    allow_list: Option<AllowList>,
    groups: Option<GroupTable>,
}

impl ChatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            allow_list: None,
            groups: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address of the TCP listener.
    pub fn tcp_addr(mut self, addr: &str) -> Self {
        self.config.tcp_addr = addr.to_string();
        self
    }

    /// Enables the WebSocket listener on `addr`.
    pub fn ws_addr(mut self, addr: &str) -> Self {
        self.config.ws_addr = Some(addr.to_string());
        self
    }

    /// Sets the path of the durable chat log.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = path.into();
        self
    }

    /// Sets how many lines are replayed to a joining session.
    pub fn history_lines(mut self, lines: usize) -> Self {
        self.config.history_lines = lines;
        self
    }

    /// Caps the number of concurrently Active sessions.
    pub fn max_sessions(mut self, max: usize) -> Self {
        self.config.max_sessions = Some(max);
        self
    }

    /// Sets how many lines may wait for one slow peer before more are
    /// dropped.
    pub fn outbound_queue_len(mut self, len: usize) -> Self {
        self.config.outbound_queue_len = len;
        self
    }

    /// Uses this allow-list instead of reading `users_file`.
    pub fn allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    /// Uses these groups instead of reading `groups_file`.
    pub fn groups(mut self, groups: GroupTable) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Loads the allow-list and groups, opens the chat log, and binds the
    /// listeners.
    ///
    /// # Errors
    /// Fails if the chat log cannot be opened or a listener cannot bind.
    pub async fn build(self) -> Result<ChatServer, ParleyError> {
        let config = self.config;
        let session_config = config.session_config();

        let allow_list = match self.allow_list {
            Some(list) => list,
            None => AllowList::load(&config.users_file, &session_config).await,
        };
        let groups = match self.groups {
            Some(groups) => groups,
            None => GroupTable::load(&config.groups_file, &session_config).await,
        };
        let log = LogSink::open(&config.log_file).await?;

        let tcp = TcpTransport::bind(&config.tcp_addr)
            .await?
            .with_max_line_len(config.max_line_len);
        let ws = match &config.ws_addr {
            Some(addr) => Some(
                WebSocketTransport::bind(addr)
                    .await?
                    .with_max_line_len(config.max_line_len),
            ),
            None => None,
        };

        let router = Router::new(
            Arc::new(SessionRegistry::new(session_config.max_sessions)),
            Arc::new(groups),
            Arc::new(HistoryBuffer::new(config.history_lines)),
            Arc::new(log),
        );
        let outbound_capacity = config.outbound_queue_len.max(router.greeting_len());
        let state = Arc::new(ServerState {
            router,
            allow_list,
            session_config,
            outbound_capacity,
        });

        Ok(ChatServer {
            tcp,
            ws,
            state,
            accept_retry_delay: config.accept_retry_delay(),
        })
    }
}

impl Default for ChatServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Parley server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct ChatServer {
    tcp: TcpTransport,
    ws: Option<WebSocketTransport>,
    state: Arc<ServerState>,
    accept_retry_delay: Duration,
}

impl ChatServer {
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }

    /// Returns the address of the TCP listener.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Returns the address of the WebSocket listener, if one is enabled.
    pub fn ws_local_addr(&self) -> Option<std::io::Result<SocketAddr>> {
        self.ws.as_ref().map(|ws| ws.local_addr())
    }

    /// Runs the accept loops until the process is terminated or every
    /// listener has failed.
    pub async fn run(self) -> Result<(), ParleyError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loops until `shutdown` resolves.
    ///
    /// Each listener gets its own loop; every accepted peer is handled on
    /// its own task. When `shutdown` resolves the listeners stop. Sessions
    /// already running are left to finish on their own.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ParleyError> {
        let mut loops = JoinSet::new();
        loops.spawn(accept_loop(
            self.tcp,
            Arc::clone(&self.state),
            self.accept_retry_delay,
        ));
        if let Some(ws) = self.ws {
            loops.spawn(accept_loop(
                ws,
                Arc::clone(&self.state),
                self.accept_retry_delay,
            ));
        }
        tracing::info!(listeners = loops.len(), "Parley server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping listeners");
                    loops.abort_all();
                    break;
                }
                joined = loops.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "accept loop panicked");
                    }
                    None => {
                        tracing::warn!("all listeners stopped");
                        break;
                    }
                },
            }
        }
        Ok(())
    }
}

/// Accepts peers on one transport until it fails for good.
///
/// Transient errors are logged and retried after `retry_delay`.
async fn accept_loop<T: Transport>(
    mut transport: T,
    state: Arc<ServerState>,
    retry_delay: Duration,
) {
    let kind = transport.kind();
    loop {
        match transport.accept().await {
            Ok(pending) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(pending, state).await {
                        tracing::debug!(
                            transport = kind,
                            error = %e,
                            "connection ended with error"
                        );
                    }
                });
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(transport = kind, error = %e, "accept failed, retrying");
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) => {
                tracing::error!(transport = kind, error = %e, "listener stopped");
                return;
            }
        }
    }
}
