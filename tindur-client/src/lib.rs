//! Tindur client: optimistic board cache plus the live change stream.
//!
//! A [`Board`] applies this session's mutations locally before the server
//! answers and rolls them back on failure; [`realtime::spawn_stream_manager`]
//! feeds it the changes other sessions make.

pub mod api_client;
pub mod board;
pub mod cache;
pub mod config;
pub mod error;
pub mod realtime;
pub mod sse;

pub use api_client::{EventStream, RecordTransport, RestClient};
pub use board::Board;
pub use cache::{CacheEngine, MutationIntent, PendingMutation, Snapshot, Submission};
pub use config::{ClientConfig, ConfigError, ReconnectConfig};
pub use error::ClientError;
pub use realtime::{spawn_stream_manager, BoardEvent};
pub use sse::{SseDecoder, SseFrame};
