//! History entries, changes and the per-record history log.

use crate::FieldPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What happened to a single element of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementOp {
    #[serde(rename = "N")]
    Added,
    #[serde(rename = "E")]
    Edited,
    #[serde(rename = "D")]
    Deleted,
}

/// Kind of a structural difference (and of the change recorded from it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffKind {
    #[serde(rename = "N")]
    Added,
    #[serde(rename = "E")]
    Edited,
    #[serde(rename = "D")]
    Deleted,
    /// Positional change in an array; the index is the last path token.
    #[serde(rename = "A")]
    ArrayChanged(ElementOp),
}

impl DiffKind {
    /// Short code used in the persisted form.
    pub fn code(self) -> &'static str {
        match self {
            DiffKind::Added => "N",
            DiffKind::Edited => "E",
            DiffKind::Deleted => "D",
            DiffKind::ArrayChanged(_) => "A",
        }
    }

    /// The underlying operation, looking through array changes.
    pub fn op(self) -> ElementOp {
        match self {
            DiffKind::Added => ElementOp::Added,
            DiffKind::Edited => ElementOp::Edited,
            DiffKind::Deleted => ElementOp::Deleted,
            DiffKind::ArrayChanged(op) => op,
        }
    }
}

/// One recorded field change inside a history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DiffKind,
    #[serde(default)]
    pub path: FieldPath,
    /// Only present for edits; additions never carry a previous value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    #[serde(default)]
    pub after: serde_json::Value,
}

/// One audit record: every change from a single save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    /// Opaque reference to whoever made the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl HistoryEntry {
    pub fn find_change(&self, change_id: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.id == change_id)
    }
}

/// How much of the log a redaction removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForgetScope {
    /// Only the named entry.
    #[default]
    Single,
    /// The named entry and every entry older than it.
    AllOlder,
}

impl ForgetScope {
    pub fn from_single(single: bool) -> Self {
        if single {
            ForgetScope::Single
        } else {
            ForgetScope::AllOlder
        }
    }
}

/// Append-only history of a record, most recent entry first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the front of the log.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in log order (newest first).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + '_ {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Locate a change by its id together with the entry that owns it.
    pub fn find_by_change_id(&self, change_id: &str) -> Option<(&HistoryEntry, &Change)> {
        self.entries
            .iter()
            .find_map(|e| e.find_change(change_id).map(|c| (e, c)))
    }

    /// Entries dated at or before `cutoff`, in log order.
    pub fn entries_at_or_before(&self, cutoff: DateTime<Utc>) -> Vec<&HistoryEntry> {
        self.entries.iter().filter(|e| e.date <= cutoff).collect()
    }

    /// The entry with `id` and every entry newer than it, in log order (so the
    /// named entry comes last). `None` when no entry has that id.
    pub fn entries_since(&self, id: &str) -> Option<Vec<&HistoryEntry>> {
        let position = self.position(id)?;
        Some(self.entries.iter().take(position + 1).collect())
    }

    /// Remove the entry with `id` (and, for `AllOlder`, everything older).
    /// Returns how many entries were removed; 0 when the id is unknown.
    pub fn remove(&mut self, id: &str, scope: ForgetScope) -> usize {
        let Some(position) = self.position(id) else {
            return 0;
        };
        match scope {
            ForgetScope::Single => {
                self.entries.remove(position);
                1
            }
            ForgetScope::AllOlder => {
                let removed = self.entries.len() - position;
                self.entries.truncate(position);
                removed
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}
