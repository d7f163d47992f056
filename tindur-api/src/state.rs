//! Shared application state for Axum routers.

use std::sync::Arc;

use tindur_storage::{InMemoryRecordStore, RecordStore, SqliteRecordStore};

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::hub::EventHub;
use crate::services::PersistenceService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PersistenceService>,
    pub hub: Arc<EventHub>,
    pub config: Arc<ApiConfig>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: ApiConfig) -> Self {
        Self {
            service: Arc::new(PersistenceService::new(store)),
            hub: Arc::new(EventHub::new(config.stream_buffer)),
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
        }
    }

    /// Build state with the store selected by `config.database_path`.
    pub fn from_config(config: ApiConfig) -> ApiResult<Self> {
        let store: Arc<dyn RecordStore> = match &config.database_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Opening SQLite record store");
                Arc::new(SqliteRecordStore::open(path)?)
            }
            None => {
                tracing::warn!("TINDUR_DATABASE_PATH not set; records are kept in memory");
                Arc::new(InMemoryRecordStore::new())
            }
        };
        Ok(Self::new(store, config))
    }
}

crate::impl_from_ref!(Arc<PersistenceService>, service);
crate::impl_from_ref!(Arc<EventHub>, hub);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(std::time::Instant, start_time);
