//! Event Hub
//!
//! In-memory registry mapping each live session to the sending half of its
//! outbound queue. Publishing fans a confirmed change out to every registered
//! session except the one that caused it.
//!
//! ## Delivery model
//!
//! - One bounded `mpsc` queue per session; events reach a session in the order
//!   they were published
//! - Publishing never awaits: each subscriber gets a single `try_send` while
//!   the registry lock is held
//! - A subscriber whose queue is full is evicted. Dropping its sender ends its
//!   stream, and the client resynchronizes when it reconnects
//! - Best-effort and in-memory only; nothing survives a restart

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tindur_core::{ChangeEvent, ChangeKind, Record, SessionId, StreamEvent};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("Session already subscribed: {0}")]
    DuplicateSession(SessionId),

    #[error("Could not queue init event for session {0}")]
    InitRejected(SessionId),
}

/// Receiving half handed to the connection that owns `session_id`.
#[derive(Debug)]
pub struct Subscription {
    pub session_id: SessionId,
    pub receiver: mpsc::Receiver<StreamEvent>,
}

/// Outcome of a single publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Sessions the event was queued for.
    pub delivered: usize,
    /// Whether the origin session was registered and skipped.
    pub skipped_origin: bool,
    /// Sessions removed because their queue was full.
    pub evicted: Vec<SessionId>,
    /// Sessions removed because their receiver was already gone.
    pub pruned: Vec<SessionId>,
}

#[derive(Debug)]
pub struct EventHub {
    subscribers: Mutex<HashMap<SessionId, mpsc::Sender<StreamEvent>>>,
    capacity: usize,
}

impl EventHub {
    /// Create a hub whose per-subscriber queues hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // The map is only ever mutated by single insert/remove calls, so a panic
    // elsewhere while the lock was held cannot leave it half-updated.
    fn registry(&self) -> MutexGuard<'_, HashMap<SessionId, mpsc::Sender<StreamEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `session_id`.
    ///
    /// The `init` event is queued on the fresh channel before the session is
    /// inserted into the registry, so it is always the first thing the
    /// connection receives.
    pub fn subscribe(&self, session_id: SessionId) -> Result<Subscription, HubError> {
        let mut subscribers = self.registry();
        if subscribers.contains_key(&session_id) {
            return Err(HubError::DuplicateSession(session_id));
        }

        let (tx, receiver) = mpsc::channel(self.capacity);
        tx.try_send(StreamEvent::Init { session_id })
            .map_err(|_| HubError::InitRejected(session_id))?;
        subscribers.insert(session_id, tx);

        info!(
            session_id = %session_id,
            subscribers = subscribers.len(),
            "Session subscribed"
        );
        Ok(Subscription {
            session_id,
            receiver,
        })
    }

    /// Remove `session_id`. Safe to call repeatedly or for unknown ids.
    pub fn unsubscribe(&self, session_id: SessionId) -> bool {
        let mut subscribers = self.registry();
        let removed = subscribers.remove(&session_id).is_some();
        if removed {
            info!(
                session_id = %session_id,
                subscribers = subscribers.len(),
                "Session unsubscribed"
            );
        }
        removed
    }

    pub fn is_subscribed(&self, session_id: SessionId) -> bool {
        self.registry().contains_key(&session_id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    /// Deliver a change to every session except `origin`.
    ///
    /// Never fails: delivery problems are logged and reflected in the report,
    /// and the affected subscriber is dropped from the registry.
    pub fn publish(
        &self,
        kind: ChangeKind,
        record: &Record,
        origin: Option<SessionId>,
    ) -> PublishReport {
        let event = StreamEvent::Change(ChangeEvent {
            kind,
            record: record.clone(),
            origin,
        });
        let mut report = PublishReport::default();

        let mut subscribers = self.registry();
        subscribers.retain(|session_id, tx| {
            if origin == Some(*session_id) {
                report.skipped_origin = true;
                return true;
            }
            match tx.try_send(event.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        session_id = %session_id,
                        capacity = self.capacity,
                        "Subscriber queue full, evicting"
                    );
                    report.evicted.push(*session_id);
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(session_id = %session_id, "Subscriber gone, pruning");
                    report.pruned.push(*session_id);
                    false
                }
            }
        });

        debug!(
            event_type = kind.as_str(),
            record_id = %record.id,
            origin = ?origin,
            delivered = report.delivered,
            evicted = report.evicted.len(),
            pruned = report.pruned.len(),
            "Published change"
        );
        report
    }
}
