//! Tindur Test Utilities
//!
//! Shared test infrastructure for the Tindur workspace:
//! - Proptest generators for records and boards
//! - Fixtures for common scenarios
//! - A fault-injecting record store
//! - Assertions for board ordering rules

pub use tindur_core::{
    CreateRecordRequest, GroupedView, Lane, ListFilter, NewRecord, Record, RecordChanges,
    RecordDelta, RecordId, StorageError, UpdateRecordRequest,
};
pub use tindur_storage::{InMemoryRecordStore, RecordStore};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// FAULT-INJECTING STORE
// ============================================================================

/// Wraps a store and fails every write while switched on.
///
/// Reads keep working, so a test can observe that a failed mutation left the
/// store untouched. The readiness ping fails along with the writes.
pub struct FlakyRecordStore {
    inner: Arc<dyn RecordStore>,
    failing: AtomicBool,
}

impl FlakyRecordStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRecordStore::new()))
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Persistence {
                reason: "injected write failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<Record, StorageError> {
        self.check()?;
        self.inner.insert(record).await
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, StorageError> {
        self.inner.get(id).await
    }

    async fn apply(
        &self,
        id: RecordId,
        changes: &RecordChanges,
    ) -> Result<Option<RecordDelta>, StorageError> {
        self.check()?;
        self.inner.apply(id, changes).await
    }

    async fn query(&self, filter: &ListFilter) -> Result<Vec<Record>, StorageError> {
        self.inner.query(filter).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check()?;
        self.inner.ping().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for board types.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    pub fn arb_lane() -> impl Strategy<Value = Lane> {
        prop_oneof![Just(Lane::Todo), Just(Lane::Doing), Just(Lane::Done)]
    }

    /// Dates within 2024, with enough collisions to exercise tie-breaking.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (1u32..=12, 1u32..=28).prop_map(|(m, d)| {
            NaiveDate::from_ymd_opt(2024, m, d).unwrap_or(NaiveDate::MIN)
        })
    }

    pub fn arb_category() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some("MATH".to_string())),
            Just(Some("ART".to_string())),
            Just(Some("HISTORY".to_string())),
        ]
    }

    pub fn arb_new_record() -> impl Strategy<Value = NewRecord> {
        (
            arb_category(),
            proptest::option::of("[A-Za-z][A-Za-z ]{0,15}"),
            proptest::option::of("[a-z ]{1,30}"),
            arb_lane(),
            arb_date(),
        )
            .prop_map(|(category, title, notes, lane, scheduled_date)| NewRecord {
                category,
                title,
                notes,
                lane,
                scheduled_date,
            })
    }

    /// A persisted record with a positive id.
    pub fn arb_record() -> impl Strategy<Value = Record> {
        (1i64..1_000_000, arb_new_record()).prop_map(|(id, new)| new.into_record(RecordId(id)))
    }

    /// Records with distinct positive ids `1..=n`.
    pub fn arb_records(max: usize) -> impl Strategy<Value = Vec<Record>> {
        prop::collection::vec(arb_new_record(), 0..=max).prop_map(|records| {
            records
                .into_iter()
                .enumerate()
                .map(|(i, new)| new.into_record(RecordId(i as i64 + 1)))
                .collect()
        })
    }

    pub fn arb_grouped_view(max: usize) -> impl Strategy<Value = GroupedView> {
        arb_records(max).prop_map(GroupedView::from_records)
    }

    /// A partial update touching a random subset of fields.
    pub fn arb_changes() -> impl Strategy<Value = RecordChanges> {
        (
            proptest::option::of(arb_category()),
            proptest::option::of(proptest::option::of("[A-Za-z]{1,12}")),
            proptest::option::of(proptest::option::of("[a-z ]{1,20}")),
            proptest::option::of(arb_lane()),
            proptest::option::of(arb_date()),
        )
            .prop_map(|(category, title, notes, lane, scheduled_date)| RecordChanges {
                category,
                title,
                notes,
                lane,
                scheduled_date,
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made records and payloads.

    use super::*;
    use chrono::NaiveDate;

    pub fn date(value: &str) -> NaiveDate {
        tindur_core::parse_date(value).unwrap_or(NaiveDate::MIN)
    }

    pub fn record(id: i64, lane: Lane, scheduled: &str) -> Record {
        Record {
            id: RecordId(id),
            category: Some("MATH".to_string()),
            title: Some(format!("Task {}", id)),
            notes: None,
            lane,
            scheduled_date: date(scheduled),
        }
    }

    pub fn new_record(title: &str, lane: Lane, scheduled: &str) -> NewRecord {
        NewRecord {
            category: Some("MATH".to_string()),
            title: Some(title.to_string()),
            notes: None,
            lane,
            scheduled_date: date(scheduled),
        }
    }

    /// The create payload from the single-client end-to-end scenario.
    pub fn math_task() -> CreateRecordRequest {
        CreateRecordRequest {
            category: Some("MATH".to_string()),
            title: Some("X".to_string()),
            notes: None,
            lane: Some(Lane::Todo),
            scheduled_date: Some("2024-01-01".to_string()),
        }
    }

    /// A store pre-populated with `records`, returned with their assigned ids.
    pub async fn seeded_store(records: Vec<NewRecord>) -> (Arc<InMemoryRecordStore>, Vec<Record>) {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            if let Ok(record) = store.insert(record).await {
                inserted.push(record);
            }
        }
        (store, inserted)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for the board ordering rules.

    use super::*;

    /// Lanes 0 and 1 non-decreasing by date, lane 2 non-increasing.
    #[track_caller]
    pub fn assert_board_ordering(view: &GroupedView) {
        for lane in [Lane::Todo, Lane::Doing] {
            for pair in view.lane(lane).windows(2) {
                assert!(
                    pair[0].scheduled_date <= pair[1].scheduled_date,
                    "lane {} out of order: {:?} before {:?}",
                    lane,
                    pair[0],
                    pair[1]
                );
            }
        }
        for pair in view.lane(Lane::Done).windows(2) {
            assert!(
                pair[0].scheduled_date >= pair[1].scheduled_date,
                "done lane out of order: {:?} before {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// Every record sits in the bucket matching its own lane.
    #[track_caller]
    pub fn assert_lanes_consistent(view: &GroupedView) {
        for (lane, record) in view.iter() {
            assert_eq!(record.lane, lane, "record {} in wrong bucket", record.id);
        }
    }

    /// `id` appears exactly once in the whole view.
    #[track_caller]
    pub fn assert_single_copy(view: &GroupedView, id: RecordId) {
        let count = view.iter().filter(|(_, r)| r.id == id).count();
        assert_eq!(count, 1, "record {} appears {} times", id, count);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_flaky_store_fails_writes_only() {
        let store = FlakyRecordStore::in_memory();
        let record = store
            .insert(fixtures::new_record("a", Lane::Todo, "2024-01-01"))
            .await
            .unwrap();

        store.fail_writes(true);
        assert!(store
            .insert(fixtures::new_record("b", Lane::Todo, "2024-01-02"))
            .await
            .is_err());
        assert_eq!(store.get(record.id).await.unwrap(), Some(record));

        store.fail_writes(false);
        assert!(store
            .apply(RecordId(1), &RecordChanges::default())
            .await
            .is_ok());
    }

    proptest! {
        #[test]
        fn prop_grouped_view_obeys_ordering(view in generators::arb_grouped_view(30)) {
            assertions::assert_board_ordering(&view);
            assertions::assert_lanes_consistent(&view);
        }
    }
}
