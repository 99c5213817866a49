//! Live-update listener for the task event channel.
//!
//! Subscribes to the backend's WebSocket endpoint, authenticating the
//! upgrade request with the session's bearer token, and routes incoming
//! task lifecycle events into the [`TaskStore`]. Connection management is
//! an explicit state machine published on a watch channel: on connection
//! loss the listener reconnects up to a bounded number of attempts with a
//! fixed delay, then gives up — the application is left without live
//! updates until the next explicit spawn (e.g. the next login).

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use taskdeck_api::event;

use crate::config::{ClientConfig, ConfigError};
use crate::store::TaskStore;

/// Type alias for the client side of the event channel WebSocket.
type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection state of the listener, observable by the caller so the
/// presentation layer can prompt a manual refresh when live updates are
/// unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Establishing the WebSocket connection.
    Connecting,
    /// Connected; events are flowing into the store.
    Connected,
    /// Connection lost; waiting out the delay before attempt `attempt`.
    Reconnecting {
        /// 1-based reconnection attempt about to be made.
        attempt: u32,
    },
    /// Gave up (attempts exhausted) or shut down; terminal until the
    /// listener is spawned again.
    Gone,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Gone => write!(f, "gone"),
        }
    }
}

/// Configuration for the live-update listener.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// WebSocket URL of the event channel.
    pub events_url: String,
    /// Bearer token authenticating the subscription.
    pub token: String,
    /// Timeout for establishing the WebSocket connection.
    pub connect_timeout: Duration,
    /// Reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,
}

impl LiveConfig {
    /// Builds a listener config from the resolved client configuration
    /// and the current session token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no events URL can be derived from the
    /// configured API URL.
    pub fn from_config(config: &ClientConfig, token: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            events_url: config.resolve_events_url()?,
            token: token.into(),
            connect_timeout: config.connect_timeout,
            max_reconnect_attempts: config.max_reconnect_attempts,
            reconnect_delay: config.reconnect_delay,
        })
    }
}

/// Handle to a spawned listener: observe its status, tear it down.
pub struct LiveHandle {
    status: watch::Receiver<ConnectionStatus>,
    shutdown: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl LiveHandle {
    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// A receiver for observing status transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Whether the listener task has exited (shut down or gave up).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Tears the subscription down and waits for the task to exit.
    ///
    /// Must be invoked when the session token becomes null (logout).
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(()).await;
        let _ = self.task.await;
    }
}

/// Outcome of a single connected read loop.
enum ReadOutcome {
    /// The caller asked us to stop.
    Shutdown,
    /// The connection dropped; reconnection may follow.
    Disconnected,
}

/// Spawns the listener feeding `store`, returning its handle.
///
/// The listener starts in [`ConnectionStatus::Connecting`] and runs until
/// shut down or its reconnection budget is exhausted.
#[must_use]
pub fn spawn(config: LiveConfig, store: Arc<TaskStore>) -> LiveHandle {
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let task = tokio::spawn(run(config, store, status_tx, shutdown_rx));
    LiveHandle {
        status: status_rx,
        shutdown: shutdown_tx,
        task,
    }
}

/// Connect/read/reconnect loop.
async fn run(
    config: LiveConfig,
    store: Arc<TaskStore>,
    status: watch::Sender<ConnectionStatus>,
    mut shutdown: mpsc::Receiver<()>,
) {
    let mut attempt: u32 = 0;
    loop {
        status.send_replace(ConnectionStatus::Connecting);
        match connect(&config).await {
            Ok(ws) => {
                tracing::info!(url = %config.events_url, "live channel connected");
                attempt = 0;
                status.send_replace(ConnectionStatus::Connected);
                match read_events(ws, &store, &mut shutdown).await {
                    ReadOutcome::Shutdown => {
                        status.send_replace(ConnectionStatus::Gone);
                        tracing::info!("live listener shut down");
                        return;
                    }
                    ReadOutcome::Disconnected => {
                        tracing::warn!("live channel lost");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(url = %config.events_url, err = %e, "live connect failed");
            }
        }

        attempt += 1;
        if attempt > config.max_reconnect_attempts {
            tracing::warn!(
                attempts = config.max_reconnect_attempts,
                "live reconnection attempts exhausted, giving up"
            );
            status.send_replace(ConnectionStatus::Gone);
            return;
        }
        status.send_replace(ConnectionStatus::Reconnecting { attempt });
        tokio::select! {
            _ = shutdown.recv() => {
                status.send_replace(ConnectionStatus::Gone);
                tracing::info!("live listener shut down while reconnecting");
                return;
            }
            () = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }
}

/// Establishes the WebSocket connection with bearer auth and a timeout.
async fn connect(config: &LiveConfig) -> Result<WsStream, String> {
    let mut request = config
        .events_url
        .as_str()
        .into_client_request()
        .map_err(|e| format!("invalid events URL: {e}"))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
        .map_err(|e| format!("token not header-safe: {e}"))?;
    let _ = request.headers_mut().insert(AUTHORIZATION, bearer);

    let (ws, _response) = tokio::time::timeout(config.connect_timeout, connect_async(request))
        .await
        .map_err(|_| "connect timed out".to_string())?
        .map_err(|e| format!("websocket handshake failed: {e}"))?;
    Ok(ws)
}

/// Reads frames until the connection drops or shutdown is requested.
///
/// Text frames decode to task events routed into the store; malformed
/// frames are logged and skipped, never fatal.
async fn read_events(
    mut ws: WsStream,
    store: &TaskStore,
    shutdown: &mut mpsc::Receiver<()>,
) -> ReadOutcome {
    loop {
        // Resolve the select to a plain value before touching the socket
        // again: the read future borrows it until a branch completes.
        let frame = tokio::select! {
            _ = shutdown.recv() => None,
            frame = ws.next() => Some(frame),
        };
        let Some(frame) = frame else {
            let _ = ws.close(None).await;
            return ReadOutcome::Shutdown;
        };

        match frame {
            Some(Ok(Message::Text(text))) => match event::decode(text.as_str()) {
                Ok(event) => {
                    tracing::debug!(id = %event.task_id(), "live event applied");
                    store.apply_event(event);
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed live event, skipping");
                }
            },
            Some(Ok(Message::Ping(data))) => {
                let _ = ws.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Close(_))) => {
                tracing::info!("live channel closed by server");
                return ReadOutcome::Disconnected;
            }
            Some(Ok(_)) => {
                // Binary/pong frames carry nothing for us.
            }
            Some(Err(e)) => {
                tracing::warn!(err = %e, "live channel read error");
                return ReadOutcome::Disconnected;
            }
            None => return ReadOutcome::Disconnected,
        }
    }
}
