//! Tindur API - Board Server
//!
//! REST endpoints for listing and mutating records, plus a Server-Sent Events
//! stream that pushes every confirmed change to all other connected sessions.
//!
//! - `services`: persistence service (validation, store calls, before/after)
//! - `hub`: in-memory subscriber registry and fan-out
//! - `stream`: per-connection lifecycle and session issuance
//! - `routes`: Axum handlers wiring the three together

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod hub;
pub mod macros;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod stream;
pub mod telemetry;

pub use auth::{AuthConfig, SharedSecret};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extract::{OriginSession, SESSION_HEADER};
pub use hub::{EventHub, HubError, PublishReport, Subscription};
pub use routes::create_api_router;
pub use services::PersistenceService;
pub use state::AppState;
pub use stream::{Connection, ConnectionState};
