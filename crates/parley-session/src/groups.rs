//! Predefined groups: a static mapping from group name to members.

use std::collections::HashMap;
use std::path::Path;

use crate::SessionConfig;

/// A named group and its members, in file order, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    members: Vec<String>,
}

impl Group {
    /// Builds a group, dropping empty and repeated member names.
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for member in members.into_iter().map(Into::into) {
            if !member.is_empty() && !unique.contains(&member) {
                unique.push(member);
            }
        }
        Self {
            name: name.into(),
            members: unique,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// All configured groups, keyed by name. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    groups: HashMap<String, Group>,
}

impl GroupTable {
    /// Builds a table from already-constructed groups. Later groups with
    /// the same name replace earlier ones.
    pub fn new(groups: impl IntoIterator<Item = Group>) -> Self {
        Self {
            groups: groups
                .into_iter()
                .map(|g| (g.name.clone(), g))
                .collect(),
        }
    }

    /// Parses the groups text format: `name:member1,member2,...` per line.
    ///
    /// Malformed lines are skipped with a warning, never fatal.
    pub fn parse(text: &str, config: &SessionConfig) -> Self {
        let mut groups = HashMap::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((name, member_list)) = line.split_once(':') else {
                tracing::warn!(line, "skipping malformed group line");
                continue;
            };
            let name = name.trim();
            let member_list = member_list.trim();

            if name.len() >= config.group_name_max_len {
                tracing::warn!(
                    group = name,
                    max = config.group_name_max_len,
                    "group name exceeds max length, ignoring"
                );
                continue;
            }
            if name.is_empty() || member_list.is_empty() {
                tracing::warn!(line, "skipping group with empty name or members");
                continue;
            }

            let members = member_list.split(',').map(str::trim).filter(|m| {
                if m.len() >= config.username_max_len {
                    tracing::warn!(
                        group = name,
                        member = *m,
                        "group member name exceeds max length, ignoring"
                    );
                    return false;
                }
                true
            });
            let group = Group::new(name, members);

            if group.members.is_empty() {
                tracing::warn!(
                    group = name,
                    "group has no valid members, ignoring"
                );
                continue;
            }
            groups.insert(group.name.clone(), group);
        }

        Self { groups }
    }

    /// Reads and parses a groups file. A missing or unreadable file yields
    /// an empty table.
    pub async fn load(path: &Path, config: &SessionConfig) -> Self {
        let table = match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::parse(&text, config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "could not read groups, no groups will be available"
                );
                Self::default()
            }
        };
        for group in table.groups.values() {
            tracing::debug!(
                group = group.name(),
                members = group.members().len(),
                "group loaded"
            );
        }
        tracing::info!(
            path = %path.display(),
            count = table.len(),
            "loaded groups"
        );
        table
    }

    /// Looks up a group by exact name.
    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
