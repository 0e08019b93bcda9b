//! Relay server core: shared state, HTTP routing, and the per-connection
//! WebSocket lifecycle.
//!
//! One listener serves two kinds of request. A WebSocket upgrade joins the
//! room named by the request path; any other `GET` is answered with a fixed
//! liveness response. Every text or binary frame a client sends is forwarded
//! unchanged to the other members of its room.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::room::RoomName;

/// Body returned to plain HTTP requests.
pub const HEALTH_BODY: &str = "Y-WebSocket Server Running\n";

/// Errors that can occur while starting the relay server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not bind to the requested address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was attempted.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The bound listener did not report its local address.
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),

    /// The server task panicked or was cancelled.
    #[error("relay server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Shared relay server state.
pub struct RelayState {
    /// Open connections grouped by room.
    pub registry: ConnectionRegistry,
    /// Frames larger than this are dropped instead of forwarded. `None`
    /// forwards everything.
    max_message_size: Option<usize>,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    /// Creates a relay state with an empty registry and no size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            max_message_size: None,
        }
    }

    /// Creates a relay state with an optional per-frame size limit.
    #[must_use]
    pub fn with_max_message_size(max_message_size: Option<usize>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            max_message_size,
        }
    }

    /// Send a WebSocket Close frame to every connected client.
    ///
    /// Used on shutdown so clients see a clean close and reconnect.
    pub async fn close_all_connections(&self) {
        let count = self.registry.len().await;
        tracing::info!(count, "closing all connections");
        self.registry.close_all().await;
    }

    fn exceeds_limit(&self, len: usize) -> bool {
        self.max_message_size.is_some_and(|max| len > max)
    }
}

/// Handles an upgraded WebSocket connection for a single client.
///
/// The connection lifecycle:
/// 1. Register the client's outbound channel under `room`.
/// 2. Forward frames from the client to the rest of the room.
/// 3. On close or transport error, unregister the client.
pub async fn handle_socket(socket: WebSocket, room: RoomName, state: Arc<RelayState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let id = state.registry.add(&room, tx).await;

    let members = state.registry.room_size(&room).await;
    tracing::info!(room = %room, connection = %id, members, "client connected");

    // Writer: drain this client's outbound queue into its socket.
    let writer_room = room.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                tracing::debug!(room = %writer_room, connection = %id, error = %e, "WebSocket write failed");
                break;
            }
        }
    });

    // Reader: forward everything this client sends to its room.
    let reader_room = room.clone();
    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            match frame {
                Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                    forward(&reader_state, &reader_room, id, &msg).await;
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(room = %reader_room, connection = %id, "received close frame");
                    break;
                }
                Ok(_) => {
                    // Ping and pong are answered by the WebSocket layer.
                }
                Err(e) => {
                    tracing::debug!(room = %reader_room, connection = %id, error = %e, "WebSocket read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    state.registry.remove(&room, id).await;
    tracing::info!(room = %room, connection = %id, "client disconnected");
}

/// Forwards one client frame to the other members of its room.
async fn forward(state: &RelayState, room: &RoomName, from: ConnectionId, msg: &Message) {
    let len = frame_len(msg);
    if state.exceeds_limit(len) {
        tracing::warn!(
            room = %room,
            connection = %from,
            size = len,
            max = ?state.max_message_size,
            "dropping frame over size limit"
        );
        return;
    }

    let delivered = state.registry.broadcast(room, from, msg).await;
    tracing::trace!(room = %room, connection = %from, size = len, delivered, "frame relayed");
}

fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(text) => text.len(),
        Message::Binary(data) => data.len(),
        _ => 0,
    }
}

/// Builds the router serving both WebSocket upgrades and liveness checks.
pub fn router(state: Arc<RelayState>) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::get(relay_handler))
        .route("/{*room}", axum::routing::get(relay_handler))
        .with_state(state)
}

/// Upgrades WebSocket requests into room members; answers anything else
/// with the liveness response.
async fn relay_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    uri: Uri,
    State(state): State<Arc<RelayState>>,
) -> Response {
    match upgrade {
        Ok(ws) => {
            let room = RoomName::from_path(uri.path());
            // Size policy lives in `forward`; the socket itself never rejects a frame.
            ws.max_frame_size(usize::MAX)
                .max_message_size(usize::MAX)
                .on_upgrade(move |socket| handle_socket(socket, room, state))
        }
        Err(_) => health().into_response(),
    }
}

fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        HEALTH_BODY,
    )
}

/// Starts the relay server on the given address and returns the bound address
/// and a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the TCP listener cannot bind to the
/// given address.
pub async fn start_server(
    addr: &str,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), ServerError> {
    start_server_with_state(addr, Arc::new(RelayState::new())).await
}

/// Starts the relay server with a pre-configured [`RelayState`].
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the TCP listener cannot bind to the
/// given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<RelayState>,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), ServerError> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let bound_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "relay server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Waits for the server task spawned by [`start_server_with_state`].
///
/// # Errors
///
/// Returns [`ServerError::Task`] if the task panicked or was cancelled.
pub async fn wait_for_server(
    handle: &mut tokio::task::JoinHandle<()>,
) -> Result<(), ServerError> {
    handle.await?;
    Ok(())
}
