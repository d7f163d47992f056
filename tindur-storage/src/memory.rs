use crate::RecordStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tindur_core::{
    ListFilter, NewRecord, Record, RecordChanges, RecordDelta, RecordId, StorageError,
};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<RecordId, Record>,
    last_id: i64,
}

/// Map-backed store for tests and ephemeral servers.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Inner>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<Record, StorageError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let record = record.into_record(RecordId(inner.last_id));
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, StorageError> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn apply(
        &self,
        id: RecordId,
        changes: &RecordChanges,
    ) -> Result<Option<RecordDelta>, StorageError> {
        let mut inner = self.inner.write().await;
        Ok(inner.records.get_mut(&id).map(|record| {
            let before = record.clone();
            changes.apply_to(record);
            RecordDelta {
                before,
                after: record.clone(),
            }
        }))
    }

    async fn query(&self, filter: &ListFilter) -> Result<Vec<Record>, StorageError> {
        let inner = self.inner.read().await;
        let mut records: Vec<Record> = inner
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.scheduled_date
                .cmp(&b.scheduled_date)
                .then(a.id.cmp(&b.id))
        });
        Ok(records)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
