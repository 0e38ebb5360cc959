//! Core types and traits for record history tracking.
//!
//! Records carry their own history log; the persisted shape of an entry is
//! `{ id, date, author?, changes: [{ id, type, path, before?, after }] }`.

mod error;
mod history;
mod path;
mod policy;
mod record;
mod traits;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use error::*;
pub use history::*;
pub use path::FieldPath;
pub use policy::*;
pub use record::*;
pub use traits::*;
