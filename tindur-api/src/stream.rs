//! Connection lifecycle for event-stream subscribers.
//!
//! Each streaming connection moves `Connecting -> Open -> Closed`. Opening
//! issues a session id and registers it with the hub; closing unregisters it
//! exactly once, whether triggered explicitly, by eviction or by drop.

use std::sync::Arc;

use tindur_core::{SessionId, StreamEvent};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::hub::{EventHub, HubError};

/// Attempts at finding a free session id before giving up.
const MAX_SESSION_ATTEMPTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// One subscriber's stake in the hub. Dropping it closes it.
#[derive(Debug)]
pub struct Connection {
    hub: Arc<EventHub>,
    session_id: Option<SessionId>,
    state: ConnectionState,
}

impl Connection {
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self {
            hub,
            session_id: None,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Issue a session id and subscribe.
    ///
    /// The first candidate is time-ordered; if it collides with a live
    /// session the remaining attempts use fully random ids. The returned
    /// receiver yields the `init` event first.
    pub fn open(&mut self) -> ApiResult<mpsc::Receiver<StreamEvent>> {
        if self.state != ConnectionState::Connecting {
            return Err(ApiError::internal_error(format!(
                "Cannot open connection in state {:?}",
                self.state
            )));
        }

        let mut candidate = SessionId::generate();
        for attempt in 1..=MAX_SESSION_ATTEMPTS {
            match self.hub.subscribe(candidate) {
                Ok(subscription) => {
                    self.session_id = Some(subscription.session_id);
                    self.state = ConnectionState::Open;
                    info!(session_id = %subscription.session_id, "Event stream opened");
                    return Ok(subscription.receiver);
                }
                Err(HubError::DuplicateSession(taken)) => {
                    warn!(session_id = %taken, attempt, "Session id collision, regenerating");
                    candidate = SessionId::random();
                }
                Err(err @ HubError::InitRejected(_)) => {
                    self.state = ConnectionState::Closed;
                    return Err(ApiError::internal_error(err.to_string()));
                }
            }
        }

        self.state = ConnectionState::Closed;
        Err(ApiError::session_conflict(candidate))
    }

    /// Unregister from the hub. Returns `true` only for the call that
    /// actually performed the transition to `Closed`.
    pub fn close(&mut self) -> bool {
        match self.state {
            ConnectionState::Closed => false,
            ConnectionState::Connecting => {
                self.state = ConnectionState::Closed;
                true
            }
            ConnectionState::Open => {
                self.state = ConnectionState::Closed;
                if let Some(session_id) = self.session_id {
                    self.hub.unsubscribe(session_id);
                    info!(session_id = %session_id, "Event stream closed");
                }
                true
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let hub = Arc::new(EventHub::new(4));
        let mut connection = Connection::new(hub.clone());
        assert_eq!(connection.state(), ConnectionState::Connecting);

        let mut receiver = connection.open().unwrap();
        assert_eq!(connection.state(), ConnectionState::Open);
        assert_eq!(hub.subscriber_count(), 1);

        let session_id = connection.session_id().unwrap();
        match receiver.try_recv() {
            Ok(StreamEvent::Init { session_id: sent }) => assert_eq!(sent, session_id),
            other => panic!("expected init, got {:?}", other),
        }

        assert!(connection.close());
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_close_is_once_only() {
        let hub = Arc::new(EventHub::new(4));
        let mut connection = Connection::new(hub.clone());
        let _receiver = connection.open().unwrap();

        assert!(connection.close());
        assert!(!connection.close());
        drop(connection);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_unregisters() {
        let hub = Arc::new(EventHub::new(4));
        {
            let mut connection = Connection::new(hub.clone());
            let _receiver = connection.open().unwrap();
            assert_eq!(hub.subscriber_count(), 1);
        }
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_cannot_reopen() {
        let hub = Arc::new(EventHub::new(4));
        let mut connection = Connection::new(hub);
        let _receiver = connection.open().unwrap();
        assert!(connection.open().is_err());
    }

    #[test]
    fn test_close_does_not_touch_other_sessions() {
        let hub = Arc::new(EventHub::new(4));
        let mut a = Connection::new(hub.clone());
        let mut b = Connection::new(hub.clone());
        let _ra = a.open().unwrap();
        let _rb = b.open().unwrap();

        a.close();
        a.close();
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.is_subscribed(b.session_id().unwrap()));
    }
}
