//! Record Service
//!
//! Validates and normalizes mutations, applies them to the record store and
//! returns what downstream notification needs.

use std::sync::Arc;

use tindur_core::{
    CreateRecordRequest, GroupedView, ListFilter, NewRecord, Record, RecordChanges, RecordDelta,
    RecordId, StorageError, TindurResult, UpdateRecordRequest,
};
use tindur_storage::RecordStore;

#[derive(Clone)]
pub struct PersistenceService {
    store: Arc<dyn RecordStore>,
}

impl PersistenceService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Records matching `filter`, grouped by lane.
    pub async fn list(&self, filter: &ListFilter) -> TindurResult<GroupedView> {
        let records = self.store.query(filter).await?;
        Ok(GroupedView::from_records(records))
    }

    /// Normalize and insert a new record.
    ///
    /// # Errors
    /// Validation failures, or `StorageError::Persistence` if the store
    /// rejects the insert. Nothing is persisted on error.
    pub async fn create(&self, payload: CreateRecordRequest) -> TindurResult<Record> {
        let record = NewRecord::try_from(payload)?;
        let record = self.store.insert(record).await?;
        tracing::debug!(record_id = %record.id, lane = %record.lane, "Record created");
        Ok(record)
    }

    pub async fn get(&self, id: RecordId) -> TindurResult<Record> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound { id }.into())
    }

    /// Apply the fields present in `payload` to record `id`.
    ///
    /// The store reads `before` under the same write that produces `after`, so
    /// concurrent updates to one record are classified against each other's
    /// results.
    ///
    /// # Errors
    /// `StorageError::NotFound` if `id` does not exist; validation failures
    /// for values that cannot be normalized.
    pub async fn update(&self, id: RecordId, payload: UpdateRecordRequest) -> TindurResult<RecordDelta> {
        let changes = RecordChanges::try_from(payload)?;
        let delta = self
            .store
            .apply(id, &changes)
            .await?
            .ok_or(StorageError::NotFound { id })?;

        tracing::debug!(
            record_id = %id,
            from_lane = %delta.before.lane,
            to_lane = %delta.after.lane,
            "Record updated"
        );
        Ok(delta)
    }

    /// Store readiness.
    pub async fn ping(&self) -> TindurResult<()> {
        Ok(self.store.ping().await?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
