//! Unauthenticated health endpoints.
//!
//! `/health/ping` answers as long as the process serves requests.
//! `/health/ready` answers 200 only while the record store responds; the
//! body also reports how many event-stream sessions the hub is holding.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::hub::EventHub;
use crate::services::PersistenceService;
use crate::state::AppState;

/// Result of pinging the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StoreCheck {
    Up { latency_ms: u64 },
    Down { error: String },
}

/// Live sessions on the event hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCheck {
    pub subscribers: usize,
    /// Events a subscriber may fall behind before it is evicted.
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub store: StoreCheck,
    pub stream: StreamCheck,
    pub version: String,
    pub uptime_seconds: u64,
}

/// GET /health/ping
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /health/ready
pub async fn readiness(
    State(service): State<Arc<PersistenceService>>,
    State(hub): State<Arc<EventHub>>,
    State(start_time): State<Instant>,
) -> (StatusCode, Json<Readiness>) {
    let started = Instant::now();
    let store = match service.ping().await {
        Ok(()) => StoreCheck::Up {
            latency_ms: started.elapsed().as_millis() as u64,
        },
        Err(err) => {
            tracing::warn!(error = %err, "Record store not ready");
            StoreCheck::Down {
                error: err.to_string(),
            }
        }
    };

    let ready = matches!(store, StoreCheck::Up { .. });
    let body = Readiness {
        ready,
        store,
        stream: StreamCheck {
            subscribers: hub.subscriber_count(),
            queue_capacity: hub.capacity(),
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/ready", get(readiness))
}
