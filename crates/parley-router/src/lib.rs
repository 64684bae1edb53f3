//! Message routing for Parley.
//!
//! Given a line from an Active session, the [`Router`] works out who should
//! see it, queues the rendered lines for those sessions, and records the
//! event in the [`HistoryBuffer`] (replayed to newcomers) and the
//! [`LogSink`] (the durable chat log).
//!
//! # Key types
//!
//! - [`Router`] — admit, route, depart
//! - [`Routed`] — outcome of routing one line
//! - [`HistoryBuffer`] — bounded ring of recent event lines
//! - [`LogSink`] — timestamped append-only log

mod error;
mod history;
mod log_sink;
mod router;

pub use error::RouterError;
pub use history::{DEFAULT_HISTORY_LINES, HistoryBuffer};
pub use log_sink::{LogSink, TIMESTAMP_FORMAT};
pub use router::{Routed, Router};
