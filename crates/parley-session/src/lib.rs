//! Session management for Parley.
//!
//! This crate handles who may connect and who is connected:
//!
//! 1. **Identity** — which usernames may log in ([`AllowList`]) and which
//!    groups exist ([`GroupTable`])
//! 2. **Lifecycle** — the per-connection state machine ([`Session`])
//! 3. **Presence** — the set of Active sessions ([`SessionRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)  ← resolves recipients through the registry
//!     ↕
//! Session Layer (this crate)  ← identity, lifecycle, presence
//!     ↕
//! Protocol / Transport (below)  ← rejection lines, ConnectionId
//! ```

mod allow_list;
mod error;
mod groups;
mod registry;
mod session;

pub use allow_list::AllowList;
pub use error::SessionError;
pub use groups::{Group, GroupTable};
pub use registry::{
    ActiveSessions, DEFAULT_OUTBOUND_CAPACITY, Outbound, OutboundReceiver,
    SessionRegistry, outbound_channel,
};
pub use session::{Session, SessionConfig, SessionState, check_username};
