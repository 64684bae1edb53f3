//! The set of usernames permitted to log in.

use std::collections::HashSet;
use std::path::Path;

use crate::SessionConfig;

/// Usernames allowed to authenticate. Case-sensitive, read-only once built.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    names: HashSet<String>,
}

impl AllowList {
    /// Builds an allow-list from already-validated names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses the allow-list text format: one username per line.
    ///
    /// Whitespace around each entry is trimmed and blank lines are skipped.
    /// Entries that could never pass the handshake length check are
    /// dropped with a warning.
    pub fn parse(text: &str, config: &SessionConfig) -> Self {
        let mut names = HashSet::new();
        for entry in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if entry.len() >= config.username_max_len {
                tracing::warn!(
                    username = entry,
                    max = config.username_max_len,
                    "allow-list entry exceeds max length, ignoring"
                );
                continue;
            }
            names.insert(entry.to_string());
        }
        Self { names }
    }

    /// Reads and parses an allow-list file.
    ///
    /// A missing or unreadable file is not fatal: it is logged and the
    /// resulting allow-list is empty, so nobody can log in.
    pub async fn load(path: &Path, config: &SessionConfig) -> Self {
        let list = match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::parse(&text, config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "could not read allow-list, no users will be allowed"
                );
                Self::default()
            }
        };
        tracing::info!(
            path = %path.display(),
            count = list.len(),
            "loaded allowed usernames"
        );
        list
    }

    /// Returns `true` if `username` may log in.
    pub fn contains(&self, username: &str) -> bool {
        self.names.contains(username)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
