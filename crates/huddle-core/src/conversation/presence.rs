//! Typing presence
//!
//! At most one entry per user, kept in the order users (re)started typing.
//! An entry is only valid while younger than the staleness window.

use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::types::{Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingEntry {
    pub user_id: UserId,
    pub user_name: String,
    pub since: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingPresence {
    entries: Vec<TypingEntry>,
}

impl TypingPresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a user's entry, moving it to the end
    pub fn upsert(&mut self, user_id: UserId, user_name: impl Into<String>, now: Timestamp) {
        self.entries.retain(|e| e.user_id != user_id);
        self.entries.push(TypingEntry {
            user_id,
            user_name: user_name.into(),
            since: now,
        });
    }

    /// Returns whether an entry was removed
    pub fn remove(&mut self, user_id: &UserId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.user_id != user_id);
        self.entries.len() != before
    }

    /// Purge entries at least `staleness` old, returning how many went
    pub fn sweep(&mut self, now: Timestamp, staleness: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| now.duration_since(e.since) < staleness);
        before - self.entries.len()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.entries.iter().any(|e| &e.user_id == user_id)
    }

    pub fn entries(&self) -> &[TypingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indicator text for everyone typing except `exclude`
    pub fn summary(&self, exclude: Option<&UserId>) -> Option<String> {
        let names: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| Some(&e.user_id) != exclude)
            .map(|e| e.user_name.as_str())
            .collect();

        match names.as_slice() {
            [] => None,
            [one] => Some(format!("{} is typing...", one)),
            [first, second] => Some(format!("{} and {} are typing...", first, second)),
            many => Some(format!("{} people are typing...", many.len())),
        }
    }
}
