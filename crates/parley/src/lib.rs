//! # Parley
//!
//! An allow-listed, multi-user chat server.
//!
//! Clients connect over raw TCP or WebSocket, identify themselves with a
//! username from the allow-list, and then exchange newline-delimited text:
//! global messages, direct messages (`PRIVMSG`), and messages to predefined
//! groups (`GROUPMSG`). Newcomers get a replay of recent history and every
//! event is appended to a durable chat log.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # async fn start() -> Result<(), ParleyError> {
//! let server = ChatServer::builder()
//!     .tcp_addr("0.0.0.0:8080")
//!     .ws_addr("0.0.0.0:8081")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::ParleyError;
pub use server::{ChatServer, ChatServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{ChatServer, ChatServerBuilder, ParleyError, ServerConfig};
    pub use parley_protocol::{
        Command, Event, HISTORY_END, HISTORY_START, REQ_USERNAME, Rejection,
        Reply,
    };
    pub use parley_router::{HistoryBuffer, LogSink, Routed, Router};
    pub use parley_session::{AllowList, Group, GroupTable, SessionConfig};
    pub use parley_transport::{ConnectionId, TransportError};
}
