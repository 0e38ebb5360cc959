//! Path addressing and structural diffing over record snapshots.

mod diff;
pub mod path;

pub use diff::{diff, Difference};
pub use track_types::{DiffKind, ElementOp, FieldPath, PathError, Snapshot};
