//! SQLite-backed record store.
//!
//! A single connection behind a mutex; every call runs on the blocking pool.
//! Filter and update statements are assembled from the fields present, with
//! values always bound as parameters.

use crate::RecordStore;
use async_trait::async_trait;
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tindur_core::{
    Lane, ListFilter, NewRecord, Record, RecordChanges, RecordDelta, RecordId, StorageError,
};

const SCHEMA_SQL: &str = include_str!("schema.sql");

const SELECT_COLUMNS: &str = "SELECT id, category, title, notes, lane, scheduled_date FROM records";

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Persistence {
                reason: format!("cannot create {}: {}", parent.display(), e),
            })?;
        }
        let conn = Connection::open(path).map_err(persistence)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(persistence)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA_SQL).map_err(persistence)?;
        tracing::debug!("record schema ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StorageError::LockPoisoned)?;
            op(&mut *conn)
        })
        .await
        .map_err(|e| StorageError::Persistence {
            reason: format!("storage task failed: {}", e),
        })?
    }
}

fn persistence(err: rusqlite::Error) -> StorageError {
    StorageError::Persistence {
        reason: err.to_string(),
    }
}

fn parse_record_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let lane: i64 = row.get(4)?;
    let lane = Lane::try_from(lane)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(e)))?;

    Ok(Record {
        id: RecordId(row.get(0)?),
        category: row.get(1)?,
        title: row.get(2)?,
        notes: row.get(3)?,
        lane,
        scheduled_date: row.get(5)?,
    })
}

fn select_by_id(conn: &Connection, id: RecordId) -> Result<Option<Record>, StorageError> {
    conn.query_row(
        &format!("{} WHERE id = ?1", SELECT_COLUMNS),
        [id.0],
        parse_record_row,
    )
    .optional()
    .map_err(persistence)
}

fn text_value(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<Record, StorageError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO records (category, title, notes, lane, scheduled_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.category,
                    record.title,
                    record.notes,
                    record.lane.as_i64(),
                    record.scheduled_date,
                ],
            )
            .map_err(persistence)?;
            let id = RecordId(conn.last_insert_rowid());
            tracing::debug!(record_id = %id, "record inserted");
            Ok(record.into_record(id))
        })
        .await
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, StorageError> {
        self.run(move |conn| select_by_id(conn, id)).await
    }

    async fn apply(
        &self,
        id: RecordId,
        changes: &RecordChanges,
    ) -> Result<Option<RecordDelta>, StorageError> {
        let changes = changes.clone();
        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(persistence)?;
            let Some(before) = select_by_id(&tx, id)? else {
                return Ok(None);
            };

            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            if let Some(category) = &changes.category {
                sets.push("category = ?");
                values.push(text_value(category));
            }
            if let Some(title) = &changes.title {
                sets.push("title = ?");
                values.push(text_value(title));
            }
            if let Some(notes) = &changes.notes {
                sets.push("notes = ?");
                values.push(text_value(notes));
            }
            if let Some(lane) = changes.lane {
                sets.push("lane = ?");
                values.push(Value::Integer(lane.as_i64()));
            }
            if let Some(date) = changes.scheduled_date {
                sets.push("scheduled_date = ?");
                values.push(Value::Text(date.format(tindur_core::DATE_FORMAT).to_string()));
            }

            if !sets.is_empty() {
                let sql = format!("UPDATE records SET {} WHERE id = ?", sets.join(", "));
                values.push(Value::Integer(id.0));
                tx.execute(&sql, rusqlite::params_from_iter(values))
                    .map_err(persistence)?;
            }

            let after = select_by_id(&tx, id)?.ok_or(StorageError::NotFound { id })?;
            tx.commit().map_err(persistence)?;
            Ok(Some(RecordDelta { before, after }))
        })
        .await
    }

    async fn query(&self, filter: &ListFilter) -> Result<Vec<Record>, StorageError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut query = format!("{} WHERE 1 = 1", SELECT_COLUMNS);
            let mut values: Vec<Value> = Vec::new();
            if let Some(category) = &filter.category {
                query.push_str(" AND category = ?");
                values.push(Value::Text(category.clone()));
            }
            if let Some(ceiling) = filter.date_ceiling {
                query.push_str(" AND scheduled_date <= ?");
                values.push(Value::Text(ceiling.format(tindur_core::DATE_FORMAT).to_string()));
            }
            query.push_str(" ORDER BY scheduled_date ASC, id ASC");

            let mut statement = conn.prepare(&query).map_err(persistence)?;
            let rows = statement
                .query_map(rusqlite::params_from_iter(values), parse_record_row)
                .map_err(persistence)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(persistence)?);
            }
            Ok(records)
        })
        .await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(persistence)
        })
        .await
    }
}
