//! Event stream manager with reconnect backoff.

use std::time::Duration;

use futures_util::StreamExt;
use rand::Rng;
use tindur_core::{ChangeEvent, SessionId, StreamEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api_client::RestClient;
use crate::config::ReconnectConfig;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// The stream is open and the client now tags mutations with `session_id`.
    Connected { session_id: SessionId },
    Remote(ChangeEvent),
    Disconnected { reason: String },
}

/// Keep a stream open for the life of `sender`.
///
/// Every connection starts with `Connected`, which is the cue to refetch: the
/// hub keeps no history, so anything published while disconnected is only
/// recovered by a full reload.
pub fn spawn_stream_manager(
    client: RestClient,
    sender: mpsc::Sender<BoardEvent>,
    reconnect: ReconnectConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = reconnect.initial_ms;
        loop {
            let reason = match run_connection(&client, &sender).await {
                Ok(Some(reason)) => {
                    backoff = reconnect.initial_ms;
                    reason
                }
                Ok(None) => return,
                Err(err) => err.to_string(),
            };
            client.set_session(None);

            if sender
                .send(BoardEvent::Disconnected {
                    reason: reason.clone(),
                })
                .await
                .is_err()
            {
                return;
            }

            let delay = jittered_backoff(backoff, reconnect.jitter_ms);
            info!(reason = %reason, delay_ms = delay, "Event stream lost; reconnecting");
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let next = (backoff as f64 * reconnect.multiplier) as u64;
            backoff = next.min(reconnect.max_ms);
        }
    })
}

/// One connection. `Ok(None)` means the receiver is gone and the manager
/// should stop; `Ok(Some(reason))` is a disconnect after a successful open.
async fn run_connection(
    client: &RestClient,
    sender: &mpsc::Sender<BoardEvent>,
) -> Result<Option<String>, ClientError> {
    let mut stream = client.open_stream().await?;

    let session_id = match stream.next().await {
        Some(Ok(StreamEvent::Init { session_id })) => session_id,
        Some(Ok(StreamEvent::Change(_))) | None => return Err(ClientError::StreamClosed),
        Some(Err(err)) => return Err(err),
    };
    client.set_session(Some(session_id));
    info!(session_id = %session_id, "Event stream connected");
    if sender
        .send(BoardEvent::Connected { session_id })
        .await
        .is_err()
    {
        return Ok(None);
    }

    while let Some(item) = stream.next().await {
        match item {
            Ok(StreamEvent::Change(change)) => {
                debug!(kind = %change.kind, id = %change.record.id, "Remote change");
                if sender.send(BoardEvent::Remote(change)).await.is_err() {
                    return Ok(None);
                }
            }
            Ok(StreamEvent::Init { .. }) => {
                warn!("Unexpected second init frame; ignoring");
            }
            Err(ClientError::Decode(err)) => {
                warn!(error = %err, "Skipping undecodable frame");
            }
            Err(err) => return Ok(Some(err.to_string())),
        }
    }
    Ok(Some("stream ended".to_string()))
}

fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    base_ms.saturating_add(rand::rng().random_range(0..jitter_ms))
}
