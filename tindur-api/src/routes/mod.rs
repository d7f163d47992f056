//! REST API Routes Module
//!
//! ```text
//! /health/{ping,ready}           unauthenticated
//! /api/v1/records                GET list, POST create
//! /api/v1/records/:id            GET one, PATCH partial update
//! /api/v1/events                 SSE change stream, also takes ?token=
//! ```

pub mod events;
pub mod health;
pub mod records;

use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::extract::SESSION_HEADER;
use crate::middleware::{auth_middleware, stream_auth_middleware, AuthMiddlewareState};
use crate::state::AppState;

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static(SESSION_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router.
///
/// Everything under `/api/v1` goes through the shared-secret check; pass
/// `AuthConfig::default()` to run without one. Only the event stream accepts
/// the secret in the query string.
pub fn create_api_router(state: AppState, auth_config: AuthConfig) -> Router {
    let auth_state = AuthMiddlewareState::new(auth_config);
    let cors = build_cors_layer(&state.config);

    let records = records::create_router()
        .layer(from_fn_with_state(auth_state.clone(), auth_middleware));
    let events = Router::new()
        .route("/events", get(events::stream_events))
        .layer(from_fn_with_state(auth_state, stream_auth_middleware));

    let api = Router::new().nest("/records", records).merge(events);

    Router::new()
        .nest("/api/v1", api)
        .nest("/health", health::create_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
