//! History entry building, revision replay and lifecycle operations.
//!
//! Everything here is synchronous and pure apart from reading the clock in
//! [`EventBuilder::build`]. Persistence belongs to the caller.

mod builder;
pub mod lifecycle;
mod revision;

pub use builder::EventBuilder;
pub use revision::{
    revise, ReplayDepth, ReplayError, ReplayFailure, Revision, RevisionReport, RevisionSelector,
    SelectorMatch,
};
pub use track_types::{ForgetScope, HistoryEntry, HistoryLog};
