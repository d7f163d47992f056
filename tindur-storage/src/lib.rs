//! Tindur Storage - Record Store
//!
//! The durable table of task records behind an async trait, so the
//! persistence service can run against SQLite in production and an in-memory
//! map in tests.

mod memory;
mod sqlite;

pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use tindur_core::{
    ListFilter, NewRecord, Record, RecordChanges, RecordDelta, RecordId, StorageError,
};

/// Async record store.
///
/// Implementations own the schema and the query predicates. All methods are
/// atomic with respect to each other.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record and return it with its assigned id.
    async fn insert(&self, record: NewRecord) -> Result<Record, StorageError>;

    /// Get a record by id.
    async fn get(&self, id: RecordId) -> Result<Option<Record>, StorageError>;

    /// Apply a partial update. Returns the record before and after, both read
    /// under the same write, or `None` if `id` does not exist.
    async fn apply(
        &self,
        id: RecordId,
        changes: &RecordChanges,
    ) -> Result<Option<RecordDelta>, StorageError>;

    /// Records matching `filter`, ascending by scheduled date then id.
    async fn query(&self, filter: &ListFilter) -> Result<Vec<Record>, StorageError>;

    /// Readiness check.
    async fn ping(&self) -> Result<(), StorageError>;
}
