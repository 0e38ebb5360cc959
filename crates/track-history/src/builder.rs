//! Turns a snapshot pair into one history entry.

use chrono::{DateTime, Utc};
use serde_json::Value;
use track_diff::{diff, Difference};
use track_types::{
    is_reserved, Change, ElementOp, HistoryEntry, IdGenerator, Schema, Snapshot, TrackingPolicy,
};

/// Builds history entries for one record type under a resolved policy.
pub struct EventBuilder<'a> {
    schema: &'a Schema,
    policy: &'a TrackingPolicy,
    ids: &'a dyn IdGenerator,
}

impl<'a> EventBuilder<'a> {
    pub fn new(schema: &'a Schema, policy: &'a TrackingPolicy, ids: &'a dyn IdGenerator) -> Self {
        Self {
            schema,
            policy,
            ids,
        }
    }

    /// Entry describing `before -> after`, dated now. `None` when nothing
    /// trackable changed.
    pub fn build(
        &self,
        before: Option<&Snapshot>,
        after: &Snapshot,
        author: Option<&str>,
    ) -> Option<HistoryEntry> {
        self.build_at(before, after, author, Utc::now())
    }

    /// Same as [`build`](Self::build) with an explicit timestamp.
    pub fn build_at(
        &self,
        before: Option<&Snapshot>,
        after: &Snapshot,
        author: Option<&str>,
        date: DateTime<Utc>,
    ) -> Option<HistoryEntry> {
        let changes: Vec<Change> = diff(before, Some(after))
            .into_iter()
            .filter_map(|d| self.to_change(d))
            .collect();
        if changes.is_empty() {
            return None;
        }
        let author = author
            .filter(|_| self.policy.author.enable)
            .map(str::to_string);
        Some(HistoryEntry {
            id: self.ids.next_id(),
            date,
            author,
            changes,
        })
    }

    fn to_change(&self, difference: Difference) -> Option<Change> {
        let root = difference.path.root()?;
        if is_reserved(root) || self.schema.is_ignored(&difference.path) {
            return None;
        }
        match difference.kind.op() {
            ElementOp::Added if self.policy.track.added => {
                let mut after = difference.after?;
                strip_reserved(&mut after);
                Some(Change {
                    id: self.ids.next_id(),
                    kind: difference.kind,
                    path: difference.path,
                    before: None,
                    after,
                })
            }
            ElementOp::Edited if self.policy.track.edited => Some(Change {
                id: self.ids.next_id(),
                kind: difference.kind,
                path: difference.path,
                before: difference.before,
                after: difference.after?,
            }),
            _ => None,
        }
    }
}

/// Drop bookkeeping keys anywhere inside a captured value.
fn strip_reserved(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !is_reserved(key));
            map.values_mut().for_each(strip_reserved);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_reserved),
        _ => {}
    }
}
