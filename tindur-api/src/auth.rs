//! Shared-secret authentication.
//!
//! A board deployment has at most one secret. Requests present it either as
//! `Authorization: Bearer <secret>` or `X-API-Key: <secret>`. Browsers cannot
//! set headers on an `EventSource`, so the event stream also accepts it as a
//! `token` query parameter.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// SHARED SECRET (TYPE-SAFE)
// ============================================================================

/// Secret wrapper that never prints its value.
#[derive(Clone)]
pub struct SharedSecret(SecretString);

impl SharedSecret {
    /// Returns `None` for an empty secret.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return None;
        }
        Some(Self(SecretString::new(secret.into())))
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Compare without short-circuiting on the first differing byte.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.expose_secret().as_bytes();
        let candidate = candidate.as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// AUTH CONFIG
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// `None` disables authentication (development only).
    pub secret: Option<SharedSecret>,
}

impl AuthConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: SharedSecret::new(secret),
        }
    }

    /// Reads `TINDUR_API_SECRET`.
    pub fn from_env() -> Self {
        let secret = std::env::var("TINDUR_API_SECRET")
            .ok()
            .and_then(SharedSecret::new);
        if secret.is_none() {
            tracing::warn!("TINDUR_API_SECRET not set; API authentication is disabled");
        }
        Self { secret }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }
}

/// Check the presented credentials against the configured secret.
pub fn authenticate(
    config: &AuthConfig,
    api_key_header: Option<&str>,
    auth_header: Option<&str>,
    query_token: Option<&str>,
) -> ApiResult<()> {
    let Some(secret) = &config.secret else {
        return Ok(());
    };

    let presented = api_key_header
        .or_else(|| auth_header.and_then(|h| h.strip_prefix("Bearer ")))
        .or(query_token)
        .ok_or_else(|| {
            ApiError::unauthorized(
                "Authentication required: provide X-API-Key or Authorization header",
            )
        })?;

    if secret.matches(presented.trim()) {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Invalid credentials"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_secret_is_redacted() {
        let secret = SharedSecret::new("hunter22").unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_empty_secret_disables_auth() {
        assert!(SharedSecret::new("").is_none());
        let config = AuthConfig::with_secret("");
        assert!(!config.is_enabled());
        assert!(authenticate(&config, None, None, None).is_ok());
    }

    #[test]
    fn test_accepts_any_credential_form() {
        let config = AuthConfig::with_secret("s3cret");
        assert!(authenticate(&config, Some("s3cret"), None, None).is_ok());
        assert!(authenticate(&config, None, Some("Bearer s3cret"), None).is_ok());
        assert!(authenticate(&config, None, None, Some("s3cret")).is_ok());
    }

    #[test]
    fn test_rejects_missing_or_wrong_secret() {
        let config = AuthConfig::with_secret("s3cret");
        let err = authenticate(&config, None, None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let err = authenticate(&config, Some("s3cre7"), None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        assert!(authenticate(&config, None, Some("Basic s3cret"), None).is_err());
    }
}
