//! Traits for record storage and identifier generation.

use crate::{Record, StoreError};
use async_trait::async_trait;
use uuid::Uuid;

/// Source of identifiers for new history entries and changes.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Record persistence used by the save/load hooks.
///
/// Contract: `get` returns `Ok(None)` for an unknown id. `save` must reject the
/// write with `StoreError::VersionConflict` when the stored version differs
/// from `expected_version`, so at most one mutation cycle per record wins.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Record>, StoreError>;

    /// Store a new record; fails with `AlreadyExists` if the id is taken.
    async fn insert(&self, record: &Record) -> Result<(), StoreError>;

    /// Replace an existing record.
    async fn save(&self, record: &Record, expected_version: u64) -> Result<(), StoreError>;

    /// All records, ordered by id.
    async fn list(&self) -> Result<Vec<Record>, StoreError>;

    /// Hard delete. Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
