//! Error types for the board client.

use tindur_api::ErrorCode;
use tindur_core::EventDecodeError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection failure, timeout or unreadable response body.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] EventDecodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Event stream closed")]
    StreamClosed,
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ClientError::Api {
                code: Some(ErrorCode::RecordNotFound),
                ..
            }
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(EventDecodeError::InvalidPayload(err))
    }
}
