//! Shared helpers for router-level tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use serde::de::DeserializeOwned;
use tindur_api::{create_api_router, ApiConfig, AppState, AuthConfig};
use tindur_storage::{InMemoryRecordStore, RecordStore};

pub fn test_state() -> AppState {
    test_state_with_store(Arc::new(InMemoryRecordStore::new()))
}

pub fn test_state_with_store(store: Arc<dyn RecordStore>) -> AppState {
    AppState::new(store, ApiConfig::default())
}

/// Router over `state` with no shared secret configured.
pub fn test_app(state: AppState) -> Router {
    create_api_router(state, AuthConfig::default())
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
