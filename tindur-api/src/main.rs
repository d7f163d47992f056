//! Tindur API Server Entry Point
//!
//! Bootstraps configuration, opens the record store and starts the Axum
//! HTTP server.

use std::net::SocketAddr;

use axum::Router;
use tindur_api::telemetry::{init_tracer, TelemetryConfig};
use tindur_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();
    if api_config.is_production() && !auth_config.is_enabled() {
        return Err(ApiError::internal_error(
            "TINDUR_API_SECRET must be set in production",
        ));
    }

    let state = AppState::from_config(api_config)?;
    let app: Router = create_api_router(state, auth_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Tindur API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("TINDUR_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("TINDUR_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
