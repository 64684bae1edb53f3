//! Server configuration, loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use parley_router::DEFAULT_HISTORY_LINES;
use parley_session::{DEFAULT_OUTBOUND_CAPACITY, SessionConfig};
use parley_transport::DEFAULT_MAX_LINE_LEN;
use serde::Deserialize;

use crate::ParleyError;

/// Everything the server needs to start.
///
/// Every key is optional in the file; missing keys take the defaults
/// below.
///
/// ```toml
/// tcp_addr = "0.0.0.0:8080"
/// ws_addr = "0.0.0.0:8081"
/// users_file = "config/users.txt"
/// groups_file = "config/groups.txt"
/// log_file = "chat_log.txt"
/// history_lines = 20
/// max_sessions = 100
/// outbound_queue_len = 1024
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address of the raw TCP listener.
    pub tcp_addr: String,
    /// Address of the WebSocket listener. No WebSocket listener if unset.
    pub ws_addr: Option<String>,
    /// Allow-list, one username per line.
    pub users_file: PathBuf,
    /// Groups, `name:member1,member2` per line.
    pub groups_file: PathBuf,
    /// Durable chat log, opened in append mode.
    pub log_file: PathBuf,
    /// Lines replayed to a newly joined session.
    pub history_lines: usize,
    /// Cap on concurrently Active sessions. Unlimited if unset.
    pub max_sessions: Option<usize>,
    /// Usernames must be shorter than this many bytes.
    pub username_max_len: usize,
    /// Group names must be shorter than this many bytes.
    pub group_name_max_len: usize,
    /// Longest inbound line, in bytes.
    pub max_line_len: usize,
    /// Lines queued per session before further lines to it are dropped.
    /// Never smaller than a full login replay.
    pub outbound_queue_len: usize,
    /// Pause after a transient accept error.
    pub accept_retry_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            tcp_addr: "0.0.0.0:8080".to_string(),
            ws_addr: None,
            users_file: PathBuf::from("config/users.txt"),
            groups_file: PathBuf::from("config/groups.txt"),
            log_file: PathBuf::from("chat_log.txt"),
            history_lines: DEFAULT_HISTORY_LINES,
            max_sessions: session.max_sessions,
            username_max_len: session.username_max_len,
            group_name_max_len: session.group_name_max_len,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            outbound_queue_len: DEFAULT_OUTBOUND_CAPACITY,
            accept_retry_delay_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ParleyError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a config file. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self, ParleyError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                let config = Self::from_toml(&text)?;
                tracing::info!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "configuration file not found, using defaults"
                );
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The subset of settings the session layer uses.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            username_max_len: self.username_max_len,
            group_name_max_len: self.group_name_max_len,
            max_sessions: self.max_sessions,
        }
    }

    pub fn accept_retry_delay(&self) -> Duration {
        Duration::from_millis(self.accept_retry_delay_ms)
    }
}
