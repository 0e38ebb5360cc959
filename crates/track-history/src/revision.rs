//! Rebuilding a record as of an earlier revision.
//!
//! Selecting by entry id reverts to the state just before that entry: its
//! changes are undone (edits write `before`, additions are removed). A deep
//! replay also undoes every newer entry first, so the record ends up exactly
//! as it was before the selected save. Selecting by change id writes that
//! change's `after`. Selecting by date replays `after` values of the entries
//! dated at or before it, oldest first.

use chrono::{DateTime, Utc};
use track_diff::path;
use track_types::{Change, DiffKind, ElementOp, HistoryEntry, HistoryLog, PathError, Record, Snapshot};

/// Target point in a record's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSelector {
    /// A history entry id, or the id of a single change.
    Id(String),
    /// Latest state recorded at or before this instant.
    At(DateTime<Utc>),
}

/// How many candidate entries a replay uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayDepth {
    /// Only the nearest entry.
    #[default]
    Shallow,
    /// The full chain of candidate entries.
    Deep,
}

/// What a selector resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorMatch {
    Entry { id: String, replayed: usize },
    Change { entry_id: String, change_id: String },
    Date { replayed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("edit has no recorded previous value")]
    MissingBefore,
}

/// A change that could not be applied. Replay carries on past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFailure {
    pub entry_id: String,
    pub change_id: String,
    pub error: ReplayError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionReport {
    /// `None` when the selector matched nothing and the record is unchanged.
    pub matched: Option<SelectorMatch>,
    /// Number of changes written.
    pub applied: usize,
    pub failures: Vec<ReplayFailure>,
}

/// Working copy of a record after replay, plus what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub record: Record,
    pub report: RevisionReport,
}

/// Reconstruct `record` at `selector`. The input is not modified and
/// nothing is persisted.
pub fn revise(record: &Record, selector: &RevisionSelector, depth: ReplayDepth) -> Revision {
    let mut working = record.clone();
    let mut replay = Replay::default();
    let matched = match selector {
        RevisionSelector::Id(id) => revise_by_id(&record.history, &mut working.fields, id, depth, &mut replay),
        RevisionSelector::At(date) => {
            revise_by_date(&record.history, &mut working.fields, *date, depth, &mut replay)
        }
    };
    Revision {
        record: working,
        report: RevisionReport {
            matched,
            applied: replay.applied,
            failures: replay.failures,
        },
    }
}

fn revise_by_id(
    log: &HistoryLog,
    fields: &mut Snapshot,
    id: &str,
    depth: ReplayDepth,
    replay: &mut Replay,
) -> Option<SelectorMatch> {
    if let Some(mut candidates) = log.entries_since(id) {
        if depth == ReplayDepth::Shallow {
            candidates = candidates.split_off(candidates.len() - 1);
        }
        for entry in &candidates {
            replay.undo_entry(fields, entry);
        }
        return Some(SelectorMatch::Entry {
            id: id.to_string(),
            replayed: candidates.len(),
        });
    }
    let (entry, change) = log.find_by_change_id(id)?;
    replay.redo(fields, entry, change);
    Some(SelectorMatch::Change {
        entry_id: entry.id.clone(),
        change_id: change.id.clone(),
    })
}

fn revise_by_date(
    log: &HistoryLog,
    fields: &mut Snapshot,
    date: DateTime<Utc>,
    depth: ReplayDepth,
    replay: &mut Replay,
) -> Option<SelectorMatch> {
    let mut candidates = log.entries_at_or_before(date);
    if candidates.is_empty() {
        return None;
    }
    if depth == ReplayDepth::Shallow {
        candidates.truncate(1);
    }
    for entry in candidates.iter().rev() {
        for change in &entry.changes {
            replay.redo(fields, entry, change);
        }
    }
    Some(SelectorMatch::Date {
        replayed: candidates.len(),
    })
}

#[derive(Default)]
struct Replay {
    applied: usize,
    failures: Vec<ReplayFailure>,
}

impl Replay {
    /// Write the change's outcome.
    fn redo(&mut self, fields: &mut Snapshot, entry: &HistoryEntry, change: &Change) {
        let outcome = match change.kind.op() {
            ElementOp::Deleted => path::remove(fields, &change.path).map(drop),
            _ => path::set(fields, &change.path, change.after.clone()).map(drop),
        };
        self.record(entry, change, outcome.map_err(ReplayError::from));
    }

    /// Take back every change of `entry`, last change first.
    fn undo_entry(&mut self, fields: &mut Snapshot, entry: &HistoryEntry) {
        for change in entry.changes.iter().rev() {
            if element_moved(fields, change) {
                continue;
            }
            let outcome = match (change.kind.op(), &change.before) {
                (ElementOp::Added, _) => path::remove(fields, &change.path)
                    .map(drop)
                    .map_err(ReplayError::from),
                (_, Some(before)) => path::set(fields, &change.path, before.clone())
                    .map(drop)
                    .map_err(ReplayError::from),
                (_, None) => Err(ReplayError::MissingBefore),
            };
            self.record(entry, change, outcome);
        }
    }

    fn record(&mut self, entry: &HistoryEntry, change: &Change, outcome: Result<(), ReplayError>) {
        match outcome {
            Ok(()) => self.applied += 1,
            Err(error) => self.failures.push(ReplayFailure {
                entry_id: entry.id.clone(),
                change_id: change.id.clone(),
                error,
            }),
        }
    }
}

/// An added array element is only removed while it still sits at its
/// recorded index. Removing by index shifts later elements, so once the slot
/// holds something else the addition counts as already undone.
fn element_moved(fields: &Snapshot, change: &Change) -> bool {
    change.kind == DiffKind::ArrayChanged(ElementOp::Added)
        && matches!(path::get(fields, &change.path), Ok(current) if *current != change.after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use track_types::FieldPath;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn edit(id: &str, path: &str, before: Value, after: Value) -> Change {
        Change {
            id: id.to_string(),
            kind: DiffKind::Edited,
            path: FieldPath::parse(path).unwrap(),
            before: Some(before),
            after,
        }
    }

    fn add(id: &str, path: &str, after: Value) -> Change {
        Change {
            id: id.to_string(),
            kind: DiffKind::Added,
            path: FieldPath::parse(path).unwrap(),
            before: None,
            after,
        }
    }

    fn entry(id: &str, secs: i64, changes: Vec<Change>) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            date: at(secs),
            author: None,
            changes,
        }
    }

    /// green/M fruit whose history is E1 (yellow->blue), E2 (blue->green, S->M).
    fn fruit() -> Record {
        let fields = match json!({ "name": "Banana", "color": "green", "size": "M" }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let mut record = Record::new("f1", fields);
        record.history.append(entry(
            "e1",
            10,
            vec![edit("c1", "color", json!("yellow"), json!("blue"))],
        ));
        record.history.append(entry(
            "e2",
            20,
            vec![
                edit("c2", "color", json!("blue"), json!("green")),
                edit("c3", "size", json!("S"), json!("M")),
            ],
        ));
        record
    }

    #[test]
    fn shallow_by_id_undoes_only_that_entry() {
        let record = fruit();
        let revision = revise(&record, &RevisionSelector::Id("e1".into()), ReplayDepth::Shallow);
        assert_eq!(revision.record.fields["color"], json!("yellow"));
        assert_eq!(revision.record.fields["size"], json!("M"));
        assert_eq!(
            revision.report.matched,
            Some(SelectorMatch::Entry {
                id: "e1".into(),
                replayed: 1
            })
        );
        assert_eq!(record.fields["color"], json!("green"));
    }

    #[test]
    fn deep_by_id_unwinds_newer_entries_too() {
        let record = fruit();
        let revision = revise(&record, &RevisionSelector::Id("e1".into()), ReplayDepth::Deep);
        assert_eq!(revision.record.fields["color"], json!("yellow"));
        assert_eq!(revision.record.fields["size"], json!("S"));
        assert_eq!(revision.report.applied, 3);
        assert!(revision.report.failures.is_empty());
    }

    #[test]
    fn shallow_and_deep_agree_on_the_newest_entry() {
        let record = fruit();
        let shallow = revise(&record, &RevisionSelector::Id("e2".into()), ReplayDepth::Shallow);
        let deep = revise(&record, &RevisionSelector::Id("e2".into()), ReplayDepth::Deep);
        assert_eq!(shallow.record, deep.record);
        assert_eq!(shallow.record.fields["color"], json!("blue"));
        assert_eq!(shallow.record.fields["size"], json!("S"));
    }

    #[test]
    fn undo_of_addition_removes_the_field() {
        let mut record = fruit();
        record.fields.insert("ripe".into(), json!(true));
        record
            .history
            .append(entry("e3", 30, vec![add("c4", "ripe", json!(true))]));
        let revision = revise(&record, &RevisionSelector::Id("e3".into()), ReplayDepth::Shallow);
        assert!(!revision.record.fields.contains_key("ripe"));
    }

    #[test]
    fn replaying_twice_matches_replaying_once() {
        let record = fruit();
        let selector = RevisionSelector::Id("e2".into());
        let once = revise(&record, &selector, ReplayDepth::Shallow).record;
        let twice = revise(&once, &selector, ReplayDepth::Shallow).record;
        assert_eq!(once, twice);
    }

    #[test]
    fn undoing_an_appended_element_twice_keeps_newer_elements() {
        let element = |id: &str, index: usize, value: &str| Change {
            id: id.to_string(),
            kind: DiffKind::ArrayChanged(ElementOp::Added),
            path: FieldPath::parse("tags").unwrap().index(index),
            before: None,
            after: json!(value),
        };
        let mut record = Record::new("f1", Snapshot::new());
        record.fields.insert("tags".into(), json!(["a", "b", "c"]));
        record.history.append(entry("e1", 10, vec![element("c1", 1, "b")]));
        record.history.append(entry("e2", 20, vec![element("c2", 2, "c")]));

        let selector = RevisionSelector::Id("e1".into());
        let once = revise(&record, &selector, ReplayDepth::Shallow);
        assert_eq!(once.record.fields["tags"], json!(["a", "c"]));
        assert_eq!(once.report.applied, 1);

        let twice = revise(&once.record, &selector, ReplayDepth::Shallow);
        assert_eq!(twice.record.fields, once.record.fields);
        assert_eq!(twice.report.applied, 0);
        assert!(twice.report.failures.is_empty());

        let deep = revise(&record, &selector, ReplayDepth::Deep);
        assert_eq!(deep.record.fields["tags"], json!(["a"]));
    }

    #[test]
    fn change_id_writes_its_after_value() {
        let record = fruit();
        let revision = revise(&record, &RevisionSelector::Id("c1".into()), ReplayDepth::Deep);
        assert_eq!(revision.record.fields["color"], json!("blue"));
        assert_eq!(revision.record.fields["size"], json!("M"));
        assert_eq!(
            revision.report.matched,
            Some(SelectorMatch::Change {
                entry_id: "e1".into(),
                change_id: "c1".into()
            })
        );
    }

    #[test]
    fn by_date_replays_after_values() {
        let mut record = fruit();
        record.fields.insert("color".into(), json!("purple"));
        record.fields.insert("size".into(), json!("XL"));

        let shallow = revise(&record, &RevisionSelector::At(at(15)), ReplayDepth::Shallow);
        assert_eq!(shallow.record.fields["color"], json!("blue"));
        assert_eq!(shallow.record.fields["size"], json!("XL"));

        let latest = revise(&record, &RevisionSelector::At(at(25)), ReplayDepth::Shallow);
        assert_eq!(latest.record.fields["color"], json!("green"));
        assert_eq!(latest.record.fields["size"], json!("M"));

        let deep = revise(&record, &RevisionSelector::At(at(25)), ReplayDepth::Deep);
        assert_eq!(deep.record.fields["color"], json!("green"));
        assert_eq!(deep.report.matched, Some(SelectorMatch::Date { replayed: 2 }));
    }

    #[test]
    fn unknown_selector_leaves_record_alone() {
        let record = fruit();
        let by_id = revise(&record, &RevisionSelector::Id("nope".into()), ReplayDepth::Deep);
        assert_eq!(by_id.record, record);
        assert_eq!(by_id.report, RevisionReport::default());

        let too_early = revise(&record, &RevisionSelector::At(at(1)), ReplayDepth::Deep);
        assert_eq!(too_early.record, record);
        assert!(too_early.report.matched.is_none());
    }

    #[test]
    fn broken_change_fails_locally() {
        let mut record = fruit();
        let mut broken = add("c5", "nested.missing", json!(1));
        broken.kind = DiffKind::Edited;
        let pathless = Change {
            path: FieldPath::default(),
            ..edit("c6", "color", json!("red"), json!("red"))
        };
        record.history.append(entry(
            "e3",
            30,
            vec![broken, pathless, edit("c7", "name", json!("Plantain"), json!("Banana"))],
        ));

        let revision = revise(&record, &RevisionSelector::Id("e3".into()), ReplayDepth::Shallow);
        assert_eq!(revision.record.fields["name"], json!("Plantain"));
        assert_eq!(revision.report.applied, 1);
        let failed: Vec<(&str, &ReplayError)> = revision
            .report
            .failures
            .iter()
            .map(|f| (f.change_id.as_str(), &f.error))
            .collect();
        assert_eq!(
            failed,
            vec![
                ("c6", &ReplayError::Path(PathError::Empty)),
                ("c5", &ReplayError::MissingBefore),
            ]
        );
    }
}
