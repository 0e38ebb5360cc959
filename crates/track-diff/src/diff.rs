//! Structural diff between two snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use track_types::{DiffKind, ElementOp, FieldPath, Snapshot};

/// One structural delta between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    pub kind: DiffKind,
    pub path: FieldPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl Difference {
    fn added(path: FieldPath, after: &Value) -> Self {
        Self {
            kind: DiffKind::Added,
            path,
            before: None,
            after: Some(after.clone()),
        }
    }

    fn deleted(path: FieldPath, before: &Value) -> Self {
        Self {
            kind: DiffKind::Deleted,
            path,
            before: Some(before.clone()),
            after: None,
        }
    }

    fn edited(path: FieldPath, before: &Value, after: &Value) -> Self {
        Self {
            kind: DiffKind::Edited,
            path,
            before: Some(before.clone()),
            after: Some(after.clone()),
        }
    }

    fn element(op: ElementOp, path: FieldPath, before: Option<&Value>, after: Option<&Value>) -> Self {
        Self {
            kind: DiffKind::ArrayChanged(op),
            path,
            before: before.cloned(),
            after: after.cloned(),
        }
    }
}

/// Differences from `before` to `after`, depth-first.
///
/// A missing snapshot counts as empty. Object keys are visited in lexical
/// order and array indices ascending, so parents precede children and
/// siblings come left to right. Equal inputs give an empty vector.
pub fn diff(before: Option<&Snapshot>, after: Option<&Snapshot>) -> Vec<Difference> {
    let empty = Snapshot::new();
    let mut out = Vec::new();
    diff_maps(
        &FieldPath::default(),
        before.unwrap_or(&empty),
        after.unwrap_or(&empty),
        &mut out,
    );
    out
}

fn diff_maps(prefix: &FieldPath, before: &Map<String, Value>, after: &Map<String, Value>, out: &mut Vec<Difference>) {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    for key in keys {
        let path = prefix.child(key.as_str());
        match (before.get(key), after.get(key)) {
            (None, Some(a)) => out.push(Difference::added(path, a)),
            (Some(b), None) => out.push(Difference::deleted(path, b)),
            (Some(b), Some(a)) => diff_values(path, b, a, out),
            (None, None) => {}
        }
    }
}

fn diff_values(path: FieldPath, before: &Value, after: &Value, out: &mut Vec<Difference>) {
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => diff_maps(&path, b, a, out),
        (Value::Array(b), Value::Array(a)) => diff_arrays(&path, b, a, out),
        _ if before == after => {}
        _ => out.push(Difference::edited(path, before, after)),
    }
}

fn diff_arrays(prefix: &FieldPath, before: &[Value], after: &[Value], out: &mut Vec<Difference>) {
    for index in 0..before.len().max(after.len()) {
        let path = prefix.index(index);
        match (before.get(index), after.get(index)) {
            (None, Some(a)) => out.push(Difference::element(ElementOp::Added, path, None, Some(a))),
            (Some(b), None) => out.push(Difference::element(ElementOp::Deleted, path, Some(b), None)),
            (Some(b), Some(a)) => match (b, a) {
                (Value::Object(bm), Value::Object(am)) => diff_maps(&path, bm, am, out),
                (Value::Array(bi), Value::Array(ai)) => diff_arrays(&path, bi, ai, out),
                _ if b == a => {}
                _ => out.push(Difference::element(ElementOp::Edited, path, Some(b), Some(a))),
            },
            (None, None) => {}
        }
    }
}
