//! Tracked records and their snapshots.

use crate::HistoryLog;
use serde::{Deserialize, Serialize};

/// Plain copy of a record's field values at one point in time.
pub type Snapshot = serde_json::Map<String, serde_json::Value>;

/// Bookkeeping field names. They never appear as tracked top-level changes
/// and are stripped from values captured for added fields.
pub const RESERVED_FIELDS: [&str; 5] = ["_id", "__v", "history", "historyAuthor", "_removed"];

pub fn is_reserved(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

/// A record with its own history log.
///
/// Persisted flat: bookkeeping fields sit next to the user fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: String,
    /// Bumped on every successful save; used for optimistic concurrency.
    #[serde(rename = "__v", default)]
    pub version: u64,
    #[serde(default)]
    pub history: HistoryLog,
    /// Soft-delete flag.
    #[serde(rename = "_removed", default)]
    pub removed: bool,
    /// Author of the mutation in progress. Cleared on save.
    #[serde(rename = "historyAuthor", default, skip_serializing_if = "Option::is_none")]
    pub pending_author: Option<String>,
    #[serde(flatten)]
    pub fields: Snapshot,
}

impl Record {
    /// Reserved names in `fields` are dropped; they belong to the bookkeeping
    /// fields and would collide with them when persisted.
    pub fn new(id: impl Into<String>, mut fields: Snapshot) -> Self {
        fields.retain(|key, _| !is_reserved(key));
        Self {
            id: id.into(),
            version: 0,
            history: HistoryLog::new(),
            removed: false,
            pending_author: None,
            fields,
        }
    }

    /// Copy of the current field values.
    pub fn snapshot(&self) -> Snapshot {
        self.fields.clone()
    }
}
