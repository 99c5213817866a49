//! Integration tests for the live-update listener against an in-process
//! WebSocket server.
//!
//! The server checks bearer auth on the upgrade request and pushes task
//! lifecycle frames from a broadcast channel, letting tests drive the
//! connect / reconnect / give-up state machine end to end.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::broadcast;

use taskdeck::live::{self, ConnectionStatus, LiveConfig};
use taskdeck::store::TaskStore;
use taskdeck_api::event::{self, TaskEvent};
use taskdeck_api::task::{Owner, Task, TaskId};

// ---------------------------------------------------------------------------
// In-process live server
// ---------------------------------------------------------------------------

struct ServerState {
    /// Frames pushed to every connected subscriber.
    events: broadcast::Sender<String>,
    /// Connections accepted so far.
    connections: AtomicU32,
    /// Close this many initial connections immediately after the upgrade.
    drop_first: u32,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer tok");
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let n = state.connections.fetch_add(1, Ordering::SeqCst);
    let close_immediately = n < state.drop_first;
    let events = state.events.subscribe();
    ws.on_upgrade(move |socket| serve_socket(socket, events, close_immediately))
}

async fn serve_socket(
    mut socket: WebSocket,
    mut events: broadcast::Receiver<String>,
    close_immediately: bool,
) {
    if close_immediately {
        return; // dropping the socket closes the connection
    }

    enum Step {
        Push(Result<String, broadcast::error::RecvError>),
        Incoming(Option<Result<Message, axum::Error>>),
    }

    loop {
        let step = tokio::select! {
            event = events.recv() => Step::Push(event),
            incoming = socket.recv() => Step::Incoming(incoming),
        };
        match step {
            Step::Push(Ok(text)) => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Step::Push(Err(_)) => break,
            Step::Incoming(Some(Ok(_))) => {}
            Step::Incoming(Some(Err(_)) | None) => break,
        }
    }
}

/// Starts the server on an OS-assigned port; returns the events URL and
/// the shared state for pushing frames.
async fn spawn_live_server(drop_first: u32) -> (String, Arc<ServerState>) {
    let (events, _) = broadcast::channel(64);
    let state = Arc::new(ServerState {
        events,
        connections: AtomicU32::new(0),
        drop_first,
    });

    let app = Router::new()
        .route("/tasks/live", get(ws_handler))
        .with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("ws://{addr}/tasks/live"), state)
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn make_live_config(events_url: &str, token: &str) -> LiveConfig {
    LiveConfig {
        events_url: events_url.to_string(),
        token: token.to_string(),
        connect_timeout: Duration::from_secs(5),
        max_reconnect_attempts: 2,
        reconnect_delay: Duration::from_millis(100),
    }
}

fn make_task(id: &str, title: &str, done: bool) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        done,
        created_at: "2025-11-03T10:15:30.000Z".to_string(),
        owner: Owner {
            id: 7,
            username: "alice".to_string(),
            fullname: "Alice Example".to_string(),
        },
    }
}

/// Waits until the status receiver observes `want` (or panics after 10s).
async fn wait_for_status(
    rx: &mut tokio::sync::watch::Receiver<ConnectionStatus>,
    want: ConnectionStatus,
) {
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("status never reached {want}"))
        .unwrap();
}

/// Polls until `cond` holds (or panics after 5s).
async fn wait_until(cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met within timeout");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_flow_into_store() {
    let (url, server) = spawn_live_server(0).await;
    let store = Arc::new(TaskStore::new());
    let handle = live::spawn(make_live_config(&url, "tok"), Arc::clone(&store));

    let mut status = handle.subscribe();
    wait_for_status(&mut status, ConnectionStatus::Connected).await;

    let created = event::encode(&TaskEvent::Created(make_task("1", "Buy milk", false))).unwrap();
    server.events.send(created).unwrap();
    wait_until(|| store.tasks().len() == 1).await;

    let updated = event::encode(&TaskEvent::Updated(make_task("1", "Buy milk", true))).unwrap();
    server.events.send(updated).unwrap();
    wait_until(|| store.task(&TaskId::new("1")).is_some_and(|t| t.done)).await;

    let deleted = event::encode(&TaskEvent::Deleted {
        id: TaskId::new("1"),
    })
    .unwrap();
    server.events.send(deleted).unwrap();
    wait_until(|| store.tasks().is_empty()).await;

    handle.shutdown().await;
}

#[tokio::test]
async fn update_event_for_unknown_id_upserts() {
    let (url, server) = spawn_live_server(0).await;
    let store = Arc::new(TaskStore::new());
    let handle = live::spawn(make_live_config(&url, "tok"), Arc::clone(&store));

    let mut status = handle.subscribe();
    wait_for_status(&mut status, ConnectionStatus::Connected).await;

    // No task "1" exists locally; the update acts as an upsert.
    let updated = event::encode(&TaskEvent::Updated(make_task("1", "Buy milk", true))).unwrap();
    server.events.send(updated).unwrap();
    wait_until(|| store.tasks().len() == 1).await;
    assert!(store.task(&TaskId::new("1")).unwrap().done);

    handle.shutdown().await;
}

#[tokio::test]
async fn malformed_frames_are_skipped() {
    let (url, server) = spawn_live_server(0).await;
    let store = Arc::new(TaskStore::new());
    let handle = live::spawn(make_live_config(&url, "tok"), Arc::clone(&store));

    let mut status = handle.subscribe();
    wait_for_status(&mut status, ConnectionStatus::Connected).await;

    server.events.send("not json".to_string()).unwrap();
    server
        .events
        .send(r#"{"event":"task_archived","data":{}}"#.to_string())
        .unwrap();
    let created = event::encode(&TaskEvent::Created(make_task("1", "Buy milk", false))).unwrap();
    server.events.send(created).unwrap();

    // The garbage was skipped and the valid frame still landed.
    wait_until(|| store.tasks().len() == 1).await;
    assert_eq!(handle.status(), ConnectionStatus::Connected);

    handle.shutdown().await;
}

#[tokio::test]
async fn rejected_handshake_exhausts_attempts_and_goes_gone() {
    let (url, _server) = spawn_live_server(0).await;
    let store = Arc::new(TaskStore::new());
    // Wrong token: every upgrade is rejected with 401.
    let handle = live::spawn(make_live_config(&url, "wrong"), Arc::clone(&store));

    let mut status = handle.subscribe();
    wait_for_status(&mut status, ConnectionStatus::Gone).await;
    assert!(store.tasks().is_empty());
}

#[tokio::test]
async fn reconnects_after_connection_drop() {
    let (url, server) = spawn_live_server(1).await;
    let store = Arc::new(TaskStore::new());
    let handle = live::spawn(make_live_config(&url, "tok"), Arc::clone(&store));

    // First connection is dropped by the server; the listener retries and
    // the second connection sticks.
    let mut status = handle.subscribe();
    wait_for_status(&mut status, ConnectionStatus::Reconnecting { attempt: 1 }).await;
    wait_for_status(&mut status, ConnectionStatus::Connected).await;
    assert_eq!(server.connections.load(Ordering::SeqCst), 2);

    // Events delivered on the new subscription still reach the store.
    let created = event::encode(&TaskEvent::Created(make_task("1", "Buy milk", false))).unwrap();
    server.events.send(created).unwrap();
    wait_until(|| store.tasks().len() == 1).await;

    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_tears_down_subscription() {
    let (url, _server) = spawn_live_server(0).await;
    let store = Arc::new(TaskStore::new());
    let handle = live::spawn(make_live_config(&url, "tok"), Arc::clone(&store));

    let mut status = handle.subscribe();
    wait_for_status(&mut status, ConnectionStatus::Connected).await;

    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .unwrap();
    assert_eq!(*status.borrow(), ConnectionStatus::Gone);
}
