//! API Configuration Module
//!
//! Configuration for CORS, the record store location and event stream tuning.
//! Loaded from environment variables with defaults suited to development.

use std::path::PathBuf;
use std::time::Duration;

/// Default capacity of each subscriber's outbound event queue.
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Default interval between keep-alive comments on idle streams.
pub const DEFAULT_KEEPALIVE_SECS: u64 = 15;

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Storage
    // ========================================================================
    /// SQLite database file. `None` keeps records in memory.
    pub database_path: Option<PathBuf>,

    // ========================================================================
    // Event stream
    // ========================================================================
    /// Per-subscriber queue capacity. A subscriber whose queue is full when
    /// an event is published is disconnected.
    pub stream_buffer: usize,

    /// Keep-alive comment interval.
    pub stream_keepalive: Duration,

    /// Deployment environment name.
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            database_path: None,
            stream_buffer: DEFAULT_STREAM_BUFFER,
            stream_keepalive: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TINDUR_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `TINDUR_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `TINDUR_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `TINDUR_DATABASE_PATH`: SQLite file (default: in-memory store)
    /// - `TINDUR_STREAM_BUFFER`: Per-subscriber queue capacity (default: 64)
    /// - `TINDUR_STREAM_KEEPALIVE_SECS`: Keep-alive interval (default: 15)
    /// - `TINDUR_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("TINDUR_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("TINDUR_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("TINDUR_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let database_path = std::env::var("TINDUR_DATABASE_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let stream_buffer = std::env::var("TINDUR_STREAM_BUFFER")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_STREAM_BUFFER);

        let stream_keepalive = std::env::var("TINDUR_STREAM_KEEPALIVE_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.stream_keepalive);

        let environment =
            std::env::var("TINDUR_ENVIRONMENT").unwrap_or_else(|_| defaults.environment.clone());

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            database_path,
            stream_buffer,
            stream_keepalive,
            environment,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.stream_buffer, DEFAULT_STREAM_BUFFER);
        assert_eq!(config.stream_keepalive, Duration::from_secs(15));
        assert!(config.database_path.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        let origins = parse_origins(" https://board.example , ,https://ops.example");
        assert_eq!(origins, vec!["https://board.example", "https://ops.example"]);
    }
}
