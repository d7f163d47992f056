//! Server-Sent Events stream of confirmed changes.
//!
//! ## Protocol
//!
//! ```text
//! GET /api/v1/events
//!
//! id: <session id>
//! event: init
//! data: <session id>
//!
//! id: <origin session id>
//! event: create | update | move
//! data: {"id":5,"category":"MATH",...}
//! ```
//!
//! The client attaches the session id from `init` to its mutations as
//! `x-session-id`, which keeps its own changes out of its stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::Stream;
use tindur_core::StreamEvent;
use tracing::warn;

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::hub::EventHub;
use crate::stream::Connection;

/// GET /api/v1/events - Subscribe to the change stream
pub async fn stream_events(
    State(hub): State<Arc<EventHub>>,
    State(config): State<Arc<ApiConfig>>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mut connection = Connection::new(hub);
    let mut receiver = connection.open()?;

    // The connection lives inside the stream: when the client goes away the
    // stream is dropped and the session unregistered.
    let stream = async_stream::stream! {
        let connection = connection;
        while let Some(event) = receiver.recv().await {
            match to_sse_event(&event) {
                Ok(frame) => yield Ok::<Event, Infallible>(frame),
                Err(err) => warn!(
                    session_id = ?connection.session_id(),
                    event_type = event.event_name(),
                    error = %err,
                    "Dropping unserializable event"
                ),
            }
        }
        // Queue closed: the hub evicted this subscriber.
        drop(connection);
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(config.stream_keepalive)))
}

/// Frame a stream event.
pub fn to_sse_event(event: &StreamEvent) -> Result<Event, serde_json::Error> {
    let mut frame = Event::default().event(event.event_name()).data(event.data()?);
    if let Some(id) = event.event_id() {
        frame = frame.id(id);
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use tindur_core::SessionId;

    /// Render frames the way a client receives them.
    async fn render(events: Vec<StreamEvent>) -> String {
        let frames: Vec<Result<Event, Infallible>> = events
            .iter()
            .map(|event| Ok(to_sse_event(event).unwrap()))
            .collect();
        let body = Sse::new(futures_util::stream::iter(frames))
            .into_response()
            .into_body();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn fields(frame: &str) -> Vec<(&str, &str)> {
        frame
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name, value.trim_start()))
            .collect()
    }

    #[tokio::test]
    async fn test_init_frame() {
        let session_id = SessionId::generate();
        let text = render(vec![StreamEvent::Init { session_id }]).await;
        let id = session_id.to_string();

        let mut fields = fields(&text);
        fields.sort();
        assert_eq!(
            fields,
            vec![("data", id.as_str()), ("event", "init"), ("id", id.as_str())]
        );
    }

    #[tokio::test]
    async fn test_change_frame_without_origin_has_no_id() {
        let record = tindur_core::Record {
            id: tindur_core::RecordId(5),
            category: Some("MATH".to_string()),
            title: Some("X".to_string()),
            notes: None,
            lane: tindur_core::Lane::Done,
            scheduled_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let event = StreamEvent::Change(tindur_core::ChangeEvent {
            kind: tindur_core::ChangeKind::Move,
            record: record.clone(),
            origin: None,
        });
        let text = render(vec![event]).await;
        let fields = fields(&text);

        assert!(fields.contains(&("event", "move")));
        assert!(!fields.iter().any(|(name, _)| *name == "id"));
        let data = fields.iter().find(|(name, _)| *name == "data").unwrap().1;
        let decoded: tindur_core::Record = serde_json::from_str(data).unwrap();
        assert_eq!(decoded, record);
    }
}
