//! Error types for Tindur domain operations.

use crate::record::RecordId;
use thiserror::Error;

/// Record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {id}")]
    NotFound { id: RecordId },

    #[error("Persistence failed: {reason}")]
    Persistence { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors raised while normalizing a mutation payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::RequiredFieldMissing {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors decoding a frame of the change stream back into a [`crate::StreamEvent`].
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    #[error("Invalid session id: {0}")]
    InvalidSession(String),

    #[error("Invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Master error type for Tindur domain errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TindurError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for Tindur operations.
pub type TindurResult<T> = Result<T, TindurError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound { id: RecordId(42) };
        let msg = format!("{}", err);
        assert!(msg.contains("Record not found"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::invalid("lane", "must be 0, 1 or 2");
        assert_eq!(format!("{}", err), "Invalid value for lane: must be 0, 1 or 2");

        let err = ValidationError::missing("scheduledDate");
        assert!(format!("{}", err).contains("scheduledDate"));
    }

    #[test]
    fn test_tindur_error_from_storage() {
        let err: TindurError = StorageError::LockPoisoned.into();
        assert!(matches!(err, TindurError::Storage(StorageError::LockPoisoned)));
        assert!(format!("{}", err).starts_with("Storage error"));
    }
}
