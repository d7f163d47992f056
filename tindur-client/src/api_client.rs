//! REST and event-stream client for the board server.

use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tindur_api::{ApiError as ApiServerError, SESSION_HEADER};
use tindur_core::{
    CreateRecordRequest, GroupedView, ListFilter, Record, RecordId, SessionId, StreamEvent,
    UpdateRecordRequest, DATE_FORMAT,
};
use tracing::debug;

use crate::config::{ClientConfig, ConfigError};
use crate::error::ClientError;
use crate::sse::SseDecoder;

/// Decoded events from `/api/v1/events`. Ends when the server closes the
/// connection; a transport error is yielded once and then the stream ends.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ClientError>> + Send>>;

/// Request/response access to the persistence service.
#[async_trait]
pub trait RecordTransport: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> Result<GroupedView, ClientError>;

    async fn create(&self, request: &CreateRecordRequest) -> Result<Record, ClientError>;

    async fn update(
        &self,
        id: RecordId,
        request: &UpdateRecordRequest,
    ) -> Result<Record, ClientError>;

    async fn get(&self, id: RecordId) -> Result<Record, ClientError>;
}

/// HTTP client. Clones share the connection pool and the session slot.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
    timeout: Duration,
    session: Arc<RwLock<Option<SessionId>>>,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        // No client-wide timeout: it would also cut the event stream.
        let client = reqwest::Client::builder().build()?;
        let auth_header = build_auth_headers(config.api_secret.as_deref())?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
            timeout: Duration::from_millis(config.request_timeout_ms),
            session: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session id mutations are tagged with, learned from `init`.
    pub fn session(&self) -> Option<SessionId> {
        *self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_session(&self, session: Option<SessionId>) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    /// Open the change stream.
    pub async fn open_stream(&self) -> Result<EventStream, ClientError> {
        let url = format!("{}/api/v1/events", self.base_url);
        let response = self
            .client
            .get(url)
            .headers(self.auth_header.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        yield Err(ClientError::Transport(err));
                        return;
                    }
                };
                for frame in decoder.push(&chunk) {
                    yield frame.decode().map_err(ClientError::from);
                }
            }
        };
        Ok(Box::pin(stream))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method, url)
            .headers(self.auth_header.clone())
            .timeout(self.timeout);
        if let Some(session) = self.session() {
            request = request.header(SESSION_HEADER, session.to_string());
        }
        request
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RecordTransport for RestClient {
    async fn list(&self, filter: &ListFilter) -> Result<GroupedView, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(category) = &filter.category {
            query.push(("category", category.clone()));
        }
        if let Some(ceiling) = filter.date_ceiling {
            query.push(("dateCeiling", ceiling.format(DATE_FORMAT).to_string()));
        }
        let response = self
            .request(reqwest::Method::GET, "/api/v1/records")
            .query(&query)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn create(&self, request: &CreateRecordRequest) -> Result<Record, ClientError> {
        let response = self
            .request(reqwest::Method::POST, "/api/v1/records")
            .json(request)
            .send()
            .await?;
        let record: Record = self.parse_response(response).await?;
        debug!(id = %record.id, "Record created");
        Ok(record)
    }

    async fn update(
        &self,
        id: RecordId,
        request: &UpdateRecordRequest,
    ) -> Result<Record, ClientError> {
        let path = format!("/api/v1/records/{}", id);
        let response = self
            .request(reqwest::Method::PATCH, &path)
            .json(request)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn get(&self, id: RecordId) -> Result<Record, ClientError> {
        let path = format!("/api/v1/records/{}", id);
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        self.parse_response(response).await
    }
}

/// Pass success through; turn anything else into `ClientError::Api`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await?;
    if let Ok(api_error) = serde_json::from_str::<ApiServerError>(&text) {
        return Err(ClientError::Api {
            status: status.as_u16(),
            code: Some(api_error.code),
            message: api_error.message,
        });
    }
    Err(ClientError::Api {
        status: status.as_u16(),
        code: None,
        message: text,
    })
}

fn build_auth_headers(secret: Option<&str>) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    if let Some(secret) = secret {
        let value = format!("Bearer {}", secret);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&value).map_err(|e| {
                ClientError::Config(ConfigError::InvalidValue {
                    field: "api_secret",
                    reason: e.to_string(),
                })
            })?,
        );
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconnectConfig;

    fn config(secret: Option<&str>) -> ClientConfig {
        ClientConfig {
            api_base_url: "http://127.0.0.1:3000/".to_string(),
            api_secret: secret.map(str::to_string),
            request_timeout_ms: 1000,
            filter_category: None,
            filter_date_ceiling: None,
            reconnect: ReconnectConfig {
                initial_ms: 10,
                max_ms: 100,
                multiplier: 2.0,
                jitter_ms: 0,
            },
        }
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = RestClient::new(&config(None)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
    }

    #[test]
    fn test_session_slot_is_shared_between_clones() {
        let client = RestClient::new(&config(None)).unwrap();
        let clone = client.clone();
        let session = SessionId::generate();
        client.set_session(Some(session));
        assert_eq!(clone.session(), Some(session));
    }

    #[test]
    fn test_secret_with_newline_is_rejected() {
        assert!(matches!(
            RestClient::new(&config(Some("bad\nsecret"))),
            Err(ClientError::Config(_))
        ));
    }
}
