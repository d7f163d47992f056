//! Middleware for the Tindur API
//!
//! - `auth`: shared-secret check applied to everything under `/api/v1`; the
//!   event stream variant also reads `?token=`

mod auth;

pub use auth::{
    auth_middleware, stream_auth_middleware, AuthMiddlewareError, AuthMiddlewareState,
};
