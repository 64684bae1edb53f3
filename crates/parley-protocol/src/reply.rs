//! Server → client lines and the event text kept in history and the log.
//!
//! Every string the server emits is produced here through `Display`, so
//! wording changes happen in one place and tests can compare against the
//! same renderer the router uses.

use std::fmt;

use crate::ProtocolError;

/// Sent on accept to request the client's identity.
pub const REQ_USERNAME: &str = "REQ_USERNAME";
/// Opens the history replay block.
pub const HISTORY_START: &str = "--- Recent Chat History ---";
/// Closes the history replay block.
pub const HISTORY_END: &str = "--- End of History ---";

/// Why a connection was refused during the handshake.
///
/// Rendered as the status keyword, and for username problems a second
/// line carrying the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyUsername,
    UsernameTooLong,
    UsernameInUse,
    NotAllowed,
    ServerFull,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => {
                write!(f, "BAD_USERNAME\nUsername cannot be empty.")
            }
            Self::UsernameTooLong => {
                write!(f, "BAD_USERNAME\nUsername too long.")
            }
            Self::UsernameInUse => {
                write!(f, "BAD_USERNAME\nUsername already in use.")
            }
            Self::NotAllowed => {
                write!(f, "NOT_ALLOWED\nUsername not on allowed list.")
            }
            Self::ServerFull => write!(f, "SERVER_FULL"),
        }
    }
}

/// A line delivered to one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply<'a> {
    Welcome { username: &'a str },
    DirectFrom { sender: &'a str, text: &'a str },
    DirectTo { recipient: &'a str, text: &'a str },
    GroupFrom { group: &'a str, sender: &'a str, text: &'a str },
    GroupTo { group: &'a str, text: &'a str },
    UserNotFound { username: &'a str },
    GroupNotFound { group: &'a str },
    Invalid(ProtocolError),
}

impl fmt::Display for Reply<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome { username } => write!(f, "Welcome, {username}!"),
            Self::DirectFrom { sender, text } => {
                write!(f, "(DM from {sender}): {text}")
            }
            Self::DirectTo { recipient, text } => {
                write!(f, "(DM to {recipient}): {text}")
            }
            Self::GroupFrom {
                group,
                sender,
                text,
            } => write!(f, "(#{group} from {sender}): {text}"),
            Self::GroupTo { group, text } => write!(f, "(To #{group}): {text}"),
            Self::UserNotFound { username } => write!(
                f,
                "System: User '{username}' not found or is offline."
            ),
            Self::GroupNotFound { group } => {
                write!(f, "System: Group '#{group}' not found.")
            }
            Self::Invalid(ProtocolError::InvalidDirect) => write!(
                f,
                "System: Invalid DM format. Use: PRIVMSG <user> <message>"
            ),
            Self::Invalid(ProtocolError::InvalidGroup) => write!(
                f,
                "System: Invalid GM format. Use: GROUPMSG <group> <message>"
            ),
        }
    }
}

/// A chat event as recorded in the history buffer and the durable log.
///
/// For joins, departures, and global messages the recorded text is exactly
/// the line broadcast to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    Joined { username: &'a str },
    Left { username: &'a str },
    Global { sender: &'a str, text: &'a str },
    Direct { sender: &'a str, recipient: &'a str, text: &'a str },
    Group { group: &'a str, sender: &'a str, text: &'a str },
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined { username } => {
                write!(f, "System: {username} has joined the chat.")
            }
            Self::Left { username } => {
                write!(f, "System: {username} has left the chat.")
            }
            Self::Global { sender, text } => write!(f, "{sender}: {text}"),
            Self::Direct {
                sender,
                recipient,
                text,
            } => write!(f, "DM from {sender} to {recipient}: {text}"),
            Self::Group {
                group,
                sender,
                text,
            } => write!(f, "GROUPMSG to #{group} from {sender}: {text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_bad_username_has_reason_line() {
        assert_eq!(
            Rejection::EmptyUsername.to_string(),
            "BAD_USERNAME\nUsername cannot be empty."
        );
        assert_eq!(
            Rejection::UsernameInUse.to_string(),
            "BAD_USERNAME\nUsername already in use."
        );
    }

    #[test]
    fn test_rejection_not_allowed_and_full() {
        assert!(Rejection::NotAllowed.to_string().starts_with("NOT_ALLOWED\n"));
        assert_eq!(Rejection::ServerFull.to_string(), "SERVER_FULL");
    }

    #[test]
    fn test_reply_direct_lines() {
        let from = Reply::DirectFrom {
            sender: "A",
            text: "hello",
        };
        let to = Reply::DirectTo {
            recipient: "B",
            text: "hello",
        };
        assert_eq!(from.to_string(), "(DM from A): hello");
        assert_eq!(to.to_string(), "(DM to B): hello");
    }

    #[test]
    fn test_reply_group_lines() {
        let from = Reply::GroupFrom {
            group: "friends",
            sender: "alice",
            text: "hey",
        };
        let to = Reply::GroupTo {
            group: "friends",
            text: "hey",
        };
        assert_eq!(from.to_string(), "(#friends from alice): hey");
        assert_eq!(to.to_string(), "(To #friends): hey");
    }

    #[test]
    fn test_reply_not_found_lines() {
        assert_eq!(
            Reply::UserNotFound { username: "zed" }.to_string(),
            "System: User 'zed' not found or is offline."
        );
        assert_eq!(
            Reply::GroupNotFound { group: "nope" }.to_string(),
            "System: Group '#nope' not found."
        );
    }

    #[test]
    fn test_reply_invalid_format_lines() {
        assert_eq!(
            Reply::Invalid(ProtocolError::InvalidDirect).to_string(),
            "System: Invalid DM format. Use: PRIVMSG <user> <message>"
        );
        assert_eq!(
            Reply::Invalid(ProtocolError::InvalidGroup).to_string(),
            "System: Invalid GM format. Use: GROUPMSG <group> <message>"
        );
    }

    #[test]
    fn test_event_log_text() {
        assert_eq!(
            Event::Joined { username: "alice" }.to_string(),
            "System: alice has joined the chat."
        );
        assert_eq!(
            Event::Left { username: "alice" }.to_string(),
            "System: alice has left the chat."
        );
        assert_eq!(
            Event::Global {
                sender: "A",
                text: "hi",
            }
            .to_string(),
            "A: hi"
        );
        assert_eq!(
            Event::Direct {
                sender: "A",
                recipient: "B",
                text: "yo",
            }
            .to_string(),
            "DM from A to B: yo"
        );
        assert_eq!(
            Event::Group {
                group: "friends",
                sender: "alice",
                text: "hey",
            }
            .to_string(),
            "GROUPMSG to #friends from alice: hey"
        );
    }
}
