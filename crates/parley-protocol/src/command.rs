//! Classification of inbound client lines.

use crate::ProtocolError;

/// Keyword that starts a direct message.
pub const PRIVMSG: &str = "PRIVMSG";
/// Keyword that starts a group message.
pub const GROUPMSG: &str = "GROUPMSG";

/// A parsed line from an authenticated client.
///
/// Borrowed from the inbound line; nothing is copied until the router
/// formats the outbound text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `PRIVMSG <recipient> <text>`
    Direct { recipient: &'a str, text: &'a str },
    /// `GROUPMSG <group> <text>`
    Group { group: &'a str, text: &'a str },
    /// Anything else.
    Global { text: &'a str },
}

impl<'a> Command<'a> {
    /// Classifies one line (terminator already stripped).
    ///
    /// Checks run in order and the first match wins: direct message, group
    /// message, then global. Classification ignores surrounding whitespace,
    /// but a global message keeps the line as sent. Returns `Ok(None)` for
    /// a line that is empty after trimming.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidDirect`] / [`ProtocolError::InvalidGroup`]
    /// when the keyword is present but the target or text is missing.
    pub fn parse(raw: &'a str) -> Result<Option<Self>, ProtocolError> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if let Some((recipient, text)) = split_keyword(line, PRIVMSG) {
            return match (recipient, text) {
                (Some(recipient), Some(text)) => {
                    Ok(Some(Self::Direct { recipient, text }))
                }
                _ => Err(ProtocolError::InvalidDirect),
            };
        }

        if let Some((group, text)) = split_keyword(line, GROUPMSG) {
            return match (group, text) {
                (Some(group), Some(text)) => {
                    Ok(Some(Self::Group { group, text }))
                }
                _ => Err(ProtocolError::InvalidGroup),
            };
        }

        Ok(Some(Self::Global {
            text: raw.trim_end_matches(['\r', '\n']),
        }))
    }
}

/// If `line` is `<keyword> <rest>`, splits `rest` into a target token and
/// the remaining text. Either half is `None` when missing or empty.
///
/// The split is on single spaces, so `PRIVMSG  bob hi` yields an empty
/// target and is rejected rather than guessed at.
fn split_keyword<'a>(
    line: &'a str,
    keyword: &str,
) -> Option<(Option<&'a str>, Option<&'a str>)> {
    let rest = line.strip_prefix(keyword)?.strip_prefix(' ')?;
    let mut parts = rest.splitn(2, ' ');
    let target = parts.next().filter(|s| !s.is_empty());
    let text = parts.next().filter(|s| !s.is_empty());
    Some((target, text))
}
