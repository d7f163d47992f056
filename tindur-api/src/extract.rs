//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use tindur_core::SessionId;

/// Header carrying the caller's event-stream session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// The session a mutation originates from, if the caller sent a valid one.
///
/// A missing or malformed header is not an error: the resulting change is
/// simply broadcast to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginSession(pub Option<SessionId>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OriginSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| SessionId::parse(s).ok());
        Ok(OriginSession(session))
    }
}
