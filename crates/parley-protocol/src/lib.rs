//! Wire protocol for Parley.
//!
//! Parley speaks plain newline-delimited text. This crate defines that
//! "language" without knowing anything about sockets or sessions:
//!
//! - **Commands** ([`Command`]) — how an inbound line is classified
//!   (direct message, group message, or global message).
//! - **Replies** ([`Reply`], [`Rejection`]) — every line the server sends.
//! - **Events** ([`Event`]) — the text kept in history and the chat log.
//! - **Errors** ([`ProtocolError`]) — malformed commands.
//!
//! ```text
//! Transport (lines) → Protocol (Command / Reply) → Router (delivery)
//! ```

mod command;
mod error;
mod reply;

pub use command::{Command, GROUPMSG, PRIVMSG};
pub use error::ProtocolError;
pub use reply::{
    Event, HISTORY_END, HISTORY_START, REQ_USERNAME, Rejection, Reply,
};
