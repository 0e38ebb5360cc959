//! Save/load hooks: snapshot capture on load, history entry on save.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use track_diff::path;
use track_history::{lifecycle, revise, EventBuilder, ReplayDepth, RevisionReport, RevisionSelector};
use track_types::{
    is_reserved, FieldPath, ForgetScope, HistoryLog, IdGenerator, PathError, PolicyOverride,
    Record, RecordStore, RecordType, Snapshot, StoreError, TrackError, UuidIdGenerator,
};

/// A record plus the field snapshot taken when it was loaded (or last saved).
#[derive(Debug, Clone)]
pub struct TrackedRecord {
    record: Record,
    original: Option<Snapshot>,
    is_new: bool,
}

impl TrackedRecord {
    fn loaded(record: Record) -> Self {
        let original = Some(record.snapshot());
        Self {
            record,
            original,
            is_new: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn fields(&self) -> &Snapshot {
        &self.record.fields
    }

    pub fn history(&self) -> &HistoryLog {
        &self.record.history
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_removed(&self) -> bool {
        self.record.removed
    }

    pub fn get(&self, dotted: &str) -> Result<&Value, TrackError> {
        let path = FieldPath::parse(dotted)?;
        Ok(path::get(&self.record.fields, &path)?)
    }

    /// Set a field by dotted path; returns the previous value. Bookkeeping
    /// fields are not writable this way.
    pub fn set(&mut self, dotted: &str, value: impl Into<Value>) -> Result<Option<Value>, TrackError> {
        let path = writable_path(dotted)?;
        Ok(path::set(&mut self.record.fields, &path, value.into())?)
    }

    pub fn unset(&mut self, dotted: &str) -> Result<Option<Value>, TrackError> {
        let path = writable_path(dotted)?;
        Ok(path::remove(&mut self.record.fields, &path)?)
    }

    /// Author for the next save only.
    pub fn set_author(&mut self, author: impl Into<String>) {
        self.record.pending_author = Some(author.into());
    }

    /// Rewind the fields in place. Nothing is stored until the next save,
    /// which records the rewind as a new entry.
    pub fn revise(&mut self, selector: &RevisionSelector, depth: ReplayDepth) -> RevisionReport {
        let revision = revise(&self.record, selector, depth);
        self.record = revision.record;
        revision.report
    }

    /// Erase history entries in place; see [`lifecycle::forget`].
    pub fn forget(&mut self, entry_id: &str, scope: ForgetScope) -> usize {
        lifecycle::forget(&mut self.record, entry_id, scope)
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

fn writable_path(dotted: &str) -> Result<FieldPath, PathError> {
    let path = FieldPath::parse(dotted)?;
    match path.root() {
        Some(root) if is_reserved(root) => Err(PathError::Reserved(root.to_string())),
        _ => Ok(path),
    }
}

/// Options for [`TrackedCollection::find`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    /// Rewind every result to this instant.
    pub revision: Option<DateTime<Utc>>,
    pub depth: ReplayDepth,
    /// Include soft-deleted records.
    pub with_removed: bool,
}

/// Records of one registered type, with history tracking on every save.
///
/// Contract: each `save` builds at most one history entry from the snapshot
/// captured at load time; concurrent saves of the same record are rejected by
/// the store's version check, and the caller reloads and retries.
pub struct TrackedCollection<S> {
    record_type: RecordType,
    store: S,
    ids: Arc<dyn IdGenerator>,
}

impl<S> TrackedCollection<S>
where
    S: RecordStore,
{
    pub fn new(record_type: RecordType, store: S) -> Self {
        Self {
            record_type,
            store,
            ids: Arc::new(UuidIdGenerator),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// New, unsaved record. Its first save records every field as added.
    pub fn build(&self, fields: Snapshot) -> TrackedRecord {
        TrackedRecord {
            record: Record::new(self.ids.next_id(), fields),
            original: None,
            is_new: true,
        }
    }

    /// Build and save in one step.
    pub async fn create(&self, fields: Snapshot, author: Option<&str>) -> Result<TrackedRecord, TrackError> {
        let mut tracked = self.build(fields);
        if let Some(author) = author {
            tracked.set_author(author);
        }
        self.save(&mut tracked).await?;
        Ok(tracked)
    }

    /// Load a record and capture its snapshot.
    pub async fn load(&self, id: &str) -> Result<Option<TrackedRecord>, TrackError> {
        Ok(self.store.get(id).await?.map(TrackedRecord::loaded))
    }

    /// Persist the record, appending a history entry when trackable fields
    /// changed since load. Returns the new entry's id.
    pub async fn save(&self, tracked: &mut TrackedRecord) -> Result<Option<String>, TrackError> {
        self.save_inner(tracked, None).await
    }

    /// Like [`save`](Self::save) with a call-site policy override.
    pub async fn save_with(
        &self,
        tracked: &mut TrackedRecord,
        policy: &PolicyOverride,
    ) -> Result<Option<String>, TrackError> {
        self.save_inner(tracked, Some(policy)).await
    }

    async fn save_inner(
        &self,
        tracked: &mut TrackedRecord,
        call_override: Option<&PolicyOverride>,
    ) -> Result<Option<String>, TrackError> {
        let policy = self.record_type.policy_for(call_override);
        let builder = EventBuilder::new(&self.record_type.schema, &policy, self.ids.as_ref());

        let mut next = tracked.record.clone();
        let author = next.pending_author.take();
        let after = next.snapshot();
        let entry = builder.build(tracked.original.as_ref(), &after, author.as_deref());
        let entry_id = entry.as_ref().map(|e| e.id.clone());
        let changes = entry.as_ref().map_or(0, |e| e.changes.len());
        if let Some(entry) = entry {
            next.history.append(entry);
        }

        if tracked.is_new {
            self.store.insert(&next).await?;
        } else {
            let expected = next.version;
            next.version += 1;
            if let Err(err) = self.store.save(&next, expected).await {
                if matches!(err, StoreError::VersionConflict { .. }) {
                    tracing::warn!(record_id = %next.id, record_type = %self.record_type.name, "save rejected: {}", err);
                }
                return Err(err.into());
            }
        }

        tracing::debug!(
            record_id = %next.id,
            record_type = %self.record_type.name,
            version = next.version,
            entry_id = entry_id.as_deref().unwrap_or("-"),
            changes,
            "record saved"
        );
        tracked.record = next;
        tracked.original = Some(after);
        tracked.is_new = false;
        Ok(entry_id)
    }

    /// Soft-delete and save. No history entry is written for the flag.
    pub async fn remove(&self, tracked: &mut TrackedRecord) -> Result<(), TrackError> {
        lifecycle::mark_removed(&mut tracked.record);
        self.save(tracked).await.map(drop)
    }

    pub async fn restore(&self, tracked: &mut TrackedRecord) -> Result<(), TrackError> {
        lifecycle::mark_restored(&mut tracked.record);
        self.save(tracked).await.map(drop)
    }

    /// Revert a stored record to `selector` and save the result.
    pub async fn revert(
        &self,
        id: &str,
        selector: &RevisionSelector,
        depth: ReplayDepth,
    ) -> Result<Option<(TrackedRecord, RevisionReport)>, TrackError> {
        let Some(mut tracked) = self.load(id).await? else {
            return Ok(None);
        };
        let report = tracked.revise(selector, depth);
        if !report.failures.is_empty() {
            tracing::warn!(record_id = %id, failures = report.failures.len(), "revision skipped changes");
        }
        self.save(&mut tracked).await?;
        Ok(Some((tracked, report)))
    }

    /// Erase history entries of a stored record and save it.
    pub async fn forget(&self, id: &str, entry_id: &str, scope: ForgetScope) -> Result<usize, TrackError> {
        let Some(mut tracked) = self.load(id).await? else {
            return Ok(0);
        };
        let removed = tracked.forget(entry_id, scope);
        if removed > 0 {
            self.save(&mut tracked).await?;
            tracing::info!(record_id = %id, entry_id, removed, "history entries forgotten");
        }
        Ok(removed)
    }

    /// Records matching `filter`. With `options.revision` set, each result is
    /// rewound to that instant (not persisted).
    pub async fn find<F>(&self, filter: F, options: &FindOptions) -> Result<Vec<Record>, TrackError>
    where
        F: Fn(&Record) -> bool,
    {
        let records = self.store.list().await?;
        let out = records
            .into_iter()
            .filter(|r| options.with_removed || !r.removed)
            .filter(|r| filter(r))
            .map(|r| match options.revision {
                Some(date) => {
                    let revision = revise(&r, &RevisionSelector::At(date), options.depth);
                    if !revision.report.failures.is_empty() {
                        tracing::warn!(
                            record_id = %r.id,
                            failures = revision.report.failures.len(),
                            "revision skipped changes"
                        );
                    }
                    revision.record
                }
                None => r,
            })
            .collect();
        Ok(out)
    }

    pub async fn find_one<F>(&self, filter: F, options: &FindOptions) -> Result<Option<Record>, TrackError>
    where
        F: Fn(&Record) -> bool,
    {
        Ok(self.find(filter, options).await?.into_iter().next())
    }

    /// Soft-delete every matching record. Returns how many changed.
    ///
    /// Records are flipped one at a time. A record whose version moved on
    /// since the listing is skipped with a warning; any other store error
    /// stops the sweep and leaves the records already flipped as they are.
    pub async fn remove_where<F>(&self, filter: F) -> Result<usize, TrackError>
    where
        F: Fn(&Record) -> bool,
    {
        self.set_removed_where(filter, true).await
    }

    pub async fn restore_where<F>(&self, filter: F) -> Result<usize, TrackError>
    where
        F: Fn(&Record) -> bool,
    {
        self.set_removed_where(filter, false).await
    }

    async fn set_removed_where<F>(&self, filter: F, removed: bool) -> Result<usize, TrackError>
    where
        F: Fn(&Record) -> bool,
    {
        let (mut count, mut skipped) = (0, 0usize);
        for mut record in self.store.list().await? {
            if record.removed == removed || !filter(&record) {
                continue;
            }
            record.removed = removed;
            let expected = record.version;
            record.version += 1;
            match self.store.save(&record, expected).await {
                Ok(()) => count += 1,
                Err(err @ StoreError::VersionConflict { .. }) => {
                    tracing::warn!(record_id = %record.id, record_type = %self.record_type.name, "bulk update skipped: {}", err);
                    skipped += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
        tracing::info!(
            record_type = %self.record_type.name,
            count,
            skipped,
            removed,
            "bulk removal flag update"
        );
        Ok(count)
    }
}
