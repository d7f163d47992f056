//! End-to-end: a real server on an ephemeral port and two client sessions.

use std::sync::Arc;
use std::time::Duration;

use tindur_api::{create_api_router, ApiConfig, AppState, AuthConfig};
use tindur_client::{
    spawn_stream_manager, Board, BoardEvent, CacheEngine, ClientConfig, ClientError,
    MutationIntent, RecordTransport, ReconnectConfig, RestClient, Submission,
};
use tindur_core::{ChangeEvent, ChangeKind, Lane, ListFilter, Record, RecordId};
use tindur_storage::{InMemoryRecordStore, RecordStore};
use tindur_test_utils::{fixtures, FlakyRecordStore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const SECRET: &str = "e2e-secret";
const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);

async fn spawn_server(store: Arc<dyn RecordStore>) -> String {
    let state = AppState::new(store, ApiConfig::default());
    let app = create_api_router(state, AuthConfig::with_secret(SECRET));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        api_base_url: base_url.to_string(),
        api_secret: Some(SECRET.to_string()),
        request_timeout_ms: 5_000,
        filter_category: None,
        filter_date_ceiling: None,
        reconnect: ReconnectConfig {
            initial_ms: 50,
            max_ms: 500,
            multiplier: 2.0,
            jitter_ms: 10,
        },
    }
}

struct Session {
    board: Board<RestClient>,
    events: mpsc::Receiver<BoardEvent>,
    manager: JoinHandle<()>,
}

impl Session {
    async fn connect(base_url: &str) -> Self {
        let config = client_config(base_url);
        let client = RestClient::new(&config).unwrap();
        let board = Board::new(client.clone(), ListFilter::new());
        let (tx, mut events) = mpsc::channel(64);
        let manager = spawn_stream_manager(client, tx, config.reconnect);

        let connected = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        assert!(matches!(connected, BoardEvent::Connected { .. }));
        board.handle_event(&connected).await.unwrap();

        Self {
            board,
            events,
            manager,
        }
    }

    async fn next_remote(&mut self) -> ChangeEvent {
        loop {
            let event = timeout(WAIT, self.events.recv()).await.unwrap().unwrap();
            self.board.handle_event(&event).await.unwrap();
            if let BoardEvent::Remote(change) = event {
                return change;
            }
        }
    }

    async fn assert_quiet(&mut self) {
        if let Ok(Some(event)) = timeout(QUIET, self.events.recv()).await {
            panic!("unexpected event: {:?}", event);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.manager.abort();
    }
}

fn create(title: &str, lane: Lane) -> MutationIntent {
    MutationIntent::Create(fixtures::new_record(title, lane, "2024-01-01"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_client_create_shows_provisional_then_confirms() {
    let base_url = spawn_server(Arc::new(InMemoryRecordStore::new())).await;
    let client = RestClient::new(&client_config(&base_url)).unwrap();

    let mut engine = CacheEngine::new(ListFilter::new());
    engine.replace_view(client.list(&ListFilter::new()).await.unwrap());
    assert!(engine.view().is_empty());

    let (pending, submission) = engine.begin(create("X", Lane::Todo));
    let provisional = engine.view().lane(Lane::Todo).to_vec();
    assert_eq!(provisional.len(), 1);
    assert!(provisional[0].id.is_provisional());

    let Submission::Create(request) = submission else {
        panic!("expected a create submission");
    };
    let confirmed = client.create(&request).await.unwrap();
    engine.confirm(pending, &confirmed);

    let todo = engine.view().lane(Lane::Todo);
    assert_eq!(todo.len(), 1);
    assert!(!todo[0].id.is_provisional());
    assert_eq!(todo[0].id, confirmed.id);
    assert_eq!(todo[0].category.as_deref(), Some("MATH"));
    assert!(engine.view().lane(Lane::Doing).is_empty());
    assert!(engine.view().lane(Lane::Done).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_move_lands_on_other_session_without_echo() {
    let base_url = spawn_server(Arc::new(InMemoryRecordStore::new())).await;
    let mut a = Session::connect(&base_url).await;
    let mut b = Session::connect(&base_url).await;

    let mut created = Vec::new();
    for i in 1..=5 {
        created.push(a.board.submit(create(&format!("task {}", i), Lane::Todo)).await.unwrap());
    }
    for _ in 1..=5 {
        let change = b.next_remote().await;
        assert_eq!(change.kind, ChangeKind::Create);
    }
    a.assert_quiet().await;

    let five: Record = created
        .into_iter()
        .find(|r| r.id == RecordId(5))
        .unwrap();
    assert_eq!(b.board.view().find(five.id).map(|(lane, _)| lane), Some(Lane::Todo));

    let moved = a
        .board
        .submit(MutationIntent::Move {
            record: five.clone(),
            target: Lane::Done,
        })
        .await
        .unwrap();
    assert_eq!(moved.lane, Lane::Done);

    let change = b.next_remote().await;
    assert_eq!(change.kind, ChangeKind::Move);
    assert_eq!(change.record.id, five.id);

    let view = b.board.view();
    assert_eq!(view.lane(Lane::Done)[0].id, five.id);
    assert!(!view.lane(Lane::Todo).iter().any(|r| r.id == five.id));
    assert_eq!(view.len(), 5);

    a.assert_quiet().await;
    assert_eq!(a.board.view().lane(Lane::Done)[0].id, five.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejected_mutation_rolls_back_and_is_not_broadcast() {
    let store = Arc::new(FlakyRecordStore::in_memory());
    let base_url = spawn_server(store.clone()).await;
    let mut a = Session::connect(&base_url).await;
    let mut b = Session::connect(&base_url).await;

    let record = a.board.submit(create("X", Lane::Todo)).await.unwrap();
    b.next_remote().await;
    let before = a.board.view();

    store.fail_writes(true);
    let err = a
        .board
        .submit(MutationIntent::Move {
            record,
            target: Lane::Doing,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 500, .. }));
    assert_eq!(a.board.view(), before);
    b.assert_quiet().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wrong_secret_is_rejected() {
    let base_url = spawn_server(Arc::new(InMemoryRecordStore::new())).await;
    let mut config = client_config(&base_url);
    config.api_secret = Some("nope".to_string());
    let client = RestClient::new(&config).unwrap();

    let err = client.list(&ListFilter::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 401, .. }));
    assert!(client.open_stream().await.is_err());
}
