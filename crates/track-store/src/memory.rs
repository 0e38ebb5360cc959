//! In-memory record store with optimistic concurrency on `version`.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use track_types::{Record, RecordStore, StoreError};

/// In-memory implementation of RecordStore. Cloning shares the same records.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    /// record_id -> record.
    records: Arc<RwLock<HashMap<String, Record>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        if guard.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id.clone()));
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record, expected_version: u64) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        let stored = guard
            .get_mut(&record.id)
            .ok_or_else(|| StoreError::NotFound(record.id.clone()))?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: record.id.clone(),
                expected: expected_version,
                actual: stored.version,
            });
        }
        *stored = record.clone();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Record>, StoreError> {
        let guard = self.records.read().await;
        let mut out: Vec<Record> = guard.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}
