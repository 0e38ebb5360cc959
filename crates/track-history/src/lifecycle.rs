//! Soft delete and history redaction.

use track_types::{ForgetScope, Record};

/// Flag the record as logically removed. History is left alone.
pub fn mark_removed(record: &mut Record) {
    record.removed = true;
}

pub fn mark_restored(record: &mut Record) {
    record.removed = false;
}

/// Erase the entry `entry_id` from the record's history; with
/// `ForgetScope::AllOlder` every older entry goes too. Returns the number of
/// entries erased, 0 if the id is unknown.
pub fn forget(record: &mut Record, entry_id: &str, scope: ForgetScope) -> usize {
    record.history.remove(entry_id, scope)
}
