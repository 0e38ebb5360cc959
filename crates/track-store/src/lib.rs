//! Record store and save/load hook dispatch for tracked records.

mod collection;
mod memory;

pub use collection::{FindOptions, TrackedCollection, TrackedRecord};
pub use memory::InMemoryRecordStore;
pub use track_types::{RecordStore, StoreError, TrackError};
