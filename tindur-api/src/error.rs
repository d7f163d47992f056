//! Error responses.
//!
//! Every failure leaves the server as `{"code": "...", "message": "..."}`
//! with the status its code maps to. The client decodes the same type.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tindur_core::{StorageError, TindurError, ValidationError};

/// What went wrong, as the board's callers need to tell it apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or wrong shared secret.
    Unauthorized,
    /// A field is present but cannot be normalized (bad date, bad lane).
    ValidationFailed,
    /// The body is not the JSON shape of a record payload.
    InvalidInput,
    MissingField,
    RecordNotFound,
    /// No free session id could be issued for a new stream.
    SessionConflict,
    /// The record store rejected or failed an operation.
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::MissingField => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorCode::SessionConflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// The offending field, for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn session_conflict(session_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::SessionConflict,
            format!("Session already connected: {}", session_id),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id } => {
                ApiError::new(ErrorCode::RecordNotFound, format!("Record not found: {}", id))
            }
            // The store's reason can name files and SQL; it goes to the log only.
            other => {
                tracing::error!(error = %other, "Record store error");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => ApiError::new(
                ErrorCode::MissingField,
                format!("Required field missing: {}", field),
            )
            .on_field(field),
            ValidationError::InvalidValue { field, reason } => ApiError::new(
                ErrorCode::ValidationFailed,
                format!("Invalid value for {}: {}", field, reason),
            )
            .on_field(field),
        }
    }
}

impl From<TindurError> for ApiError {
    fn from(err: TindurError) -> Self {
        match err {
            TindurError::Storage(e) => e.into(),
            TindurError::Validation(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        ApiError::invalid_input(rejection.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!(error = %err, "JSON serialization failed");
        ApiError::internal_error(format!("JSON serialization failed: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
