//! Axum middleware for shared-secret authentication.
//!
//! Runs before any handler under `/api/v1`, so a rejected request never
//! reaches the persistence service and causes no state change.

use crate::auth::{authenticate, AuthConfig};
use crate::error::ApiError;
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Reject requests that do not present the configured secret in a header.
///
/// ```ignore
/// let app = Router::new()
///     .route("/records", get(list_records))
///     .layer(middleware::from_fn_with_state(auth_state, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    check(&state, &request, None)?;
    Ok(next.run(request).await)
}

/// Header check that also takes `?token=`, for the event stream only.
pub async fn stream_auth_middleware(
    State(state): State<AuthMiddlewareState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let query_token = Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.token);
    check(&state, &request, query_token.as_deref())?;
    Ok(next.run(request).await)
}

fn check(
    state: &AuthMiddlewareState,
    request: &Request,
    query_token: Option<&str>,
) -> Result<(), AuthMiddlewareError> {
    if !state.auth_config.is_enabled() {
        return Ok(());
    }

    let api_key_header = request
        .headers()
        .get("x-api-key")
        .and_then(|h| h.to_str().ok());

    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());

    authenticate(&state.auth_config, api_key_header, auth_header, query_token).map_err(|err| {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        AuthMiddlewareError(err)
    })
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}
