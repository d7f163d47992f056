//! A session's board: the cache engine wired to a transport.

use std::sync::{Mutex, MutexGuard};

use tindur_core::{ChangeEvent, GroupedView, ListFilter, Record};
use tracing::{info, warn};

use crate::api_client::RecordTransport;
use crate::cache::{CacheEngine, MutationIntent, Submission};
use crate::error::ClientError;
use crate::realtime::BoardEvent;

/// Mutations from one session are applied and submitted strictly in the
/// order `submit` was called; remote events and refetches interleave freely.
pub struct Board<T> {
    transport: T,
    engine: Mutex<CacheEngine>,
    queue: tokio::sync::Mutex<()>,
}

impl<T: RecordTransport> Board<T> {
    pub fn new(transport: T, filter: ListFilter) -> Self {
        Self {
            transport,
            engine: Mutex::new(CacheEngine::new(filter)),
            queue: tokio::sync::Mutex::new(()),
        }
    }

    /// A copy of the current local view.
    pub fn view(&self) -> GroupedView {
        self.engine().view().clone()
    }

    /// Apply `intent` locally, submit it, then confirm or roll back.
    pub async fn submit(&self, intent: MutationIntent) -> Result<Record, ClientError> {
        let _turn = self.queue.lock().await;

        let (pending, submission) = self.engine().begin(intent);
        let result = match &submission {
            Submission::Create(request) => self.transport.create(request).await,
            Submission::Update { id, request } => self.transport.update(*id, request).await,
        };

        match result {
            Ok(record) => {
                self.engine().confirm(pending, &record);
                Ok(record)
            }
            Err(err) => {
                warn!(
                    kind = %pending.kind(),
                    id = %pending.id(),
                    error = %err,
                    "Submission failed; rolling back"
                );
                self.engine().rollback(pending);
                Err(err)
            }
        }
    }

    /// Apply a confirmed change from another session.
    pub fn apply_remote(&self, event: &ChangeEvent) {
        self.engine().apply_remote(event);
    }

    /// Refetch the whole view from the server.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let filter = self.engine().filter().clone();
        let view = self.transport.list(&filter).await?;
        info!(records = view.len(), "Board refreshed");
        self.engine().replace_view(view);
        Ok(())
    }

    /// React to the stream manager: resync on connect, apply remote changes.
    pub async fn handle_event(&self, event: &BoardEvent) -> Result<(), ClientError> {
        match event {
            BoardEvent::Connected { .. } => self.refresh().await,
            BoardEvent::Remote(change) => {
                self.apply_remote(change);
                Ok(())
            }
            BoardEvent::Disconnected { .. } => Ok(()),
        }
    }

    fn engine(&self) -> MutexGuard<'_, CacheEngine> {
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }
}
