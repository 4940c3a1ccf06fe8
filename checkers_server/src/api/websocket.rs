//! WebSocket transport for the room protocol.
//!
//! Each text frame carries one JSON [`ClientCommand`]. Direct replies
//! (`room-joined`, `allowed-moves`, `ack`, `error`) go to the sender only;
//! `room-state` and `displaced` events are pushed by the room actors.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. Server spawns a send task that drains both the reply channel and the
//!    event channel registered with room actors
//! 3. Incoming frames are rate limited, parsed and dispatched in order
//! 4. On disconnect the seat is released but stays reserved for the token
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//! ws.send(JSON.stringify({ type: "create-room" }));
//! ws.send(JSON.stringify({ type: "make-move", from: [2, 1], to: [3, 2] }));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use checkers::{ClientCommand, Connection, RoomError, ServerMessage, room::RoomEvent};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use std::time::Instant;
use tokio::sync::mpsc;

use super::{AppState, rate_limiter::ConnectionLimits};
use crate::{logging, metrics};

/// Capacity of the per-connection reply channel
const REPLY_BUFFER: usize = 32;

/// Upgrade an HTTP connection to a WebSocket speaking the room protocol.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
///
/// # Arguments
///
/// - `socket`: The WebSocket connection
/// - `state`: Shared application state
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let event_buffer = state.directory.config().event_buffer;
    let (event_tx, mut event_rx) = mpsc::channel::<RoomEvent>(event_buffer);
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(REPLY_BUFFER);

    let mut connection = Connection::new(state.directory.clone(), event_tx);
    let connection_id = connection.id();
    let mut limits = ConnectionLimits::new();

    metrics::websocket_connection_opened();
    info!("WebSocket connected: connection={}", connection_id);

    let send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                biased;
                Some(reply) = reply_rx.recv() => reply,
                Some(event) = event_rx.recv() => ServerMessage::from(event),
                else => break,
            };

            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize {}: {}", message, e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            metrics::websocket_messages_sent();
        }
    });

    while let Some(msg) = receiver.next().await {
        let reply = match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                if let Err(limiter) = limits.admit() {
                    logging::log_rate_limited(connection_id, limiter);
                    metrics::rate_limit_hits_total(limiter);
                    Some(ServerMessage::rate_limited())
                } else {
                    match serde_json::from_str::<ClientCommand>(&text) {
                        Ok(command) => handle_command(&mut connection, command).await,
                        Err(e) => {
                            warn!("Connection {}: malformed frame: {}", connection_id, e);
                            metrics::commands_total("unknown", "BadRequest");
                            Some(ServerMessage::error(&RoomError::BadRequest(e.to_string())))
                        }
                    }
                }
            }
            Ok(Message::Binary(_)) => Some(ServerMessage::error(&RoomError::BadRequest(
                "binary frames are not supported".to_string(),
            ))),
            Ok(Message::Close(_)) => {
                info!("WebSocket closed by peer: connection={}", connection_id);
                break;
            }
            Ok(_) => None,
            Err(e) => {
                warn!("WebSocket error on connection {}: {}", connection_id, e);
                break;
            }
        };

        if let Some(reply) = reply
            && reply_tx.send(reply).await.is_err()
        {
            break;
        }
    }

    connection.close().await;
    send_task.abort();
    metrics::websocket_connection_closed();

    info!("WebSocket disconnected: connection={}", connection_id);
}

/// Dispatch one command and record how it went.
async fn handle_command(
    connection: &mut Connection,
    command: ClientCommand,
) -> Option<ServerMessage> {
    let name = command.name();
    let is_move = matches!(command, ClientCommand::MakeMove { .. });
    let start = Instant::now();

    let reply = connection.handle(command).await;

    let outcome = match &reply {
        Some(ServerMessage::Error { reason, .. }) => reason.as_str(),
        _ => "ok",
    };
    let elapsed = start.elapsed();

    metrics::commands_total(name, outcome);
    metrics::command_duration_ms(name, elapsed.as_secs_f64() * 1000.0);
    if is_move && outcome == "ok" {
        metrics::moves_applied_total();
    }
    logging::log_command(connection.id(), name, outcome, elapsed.as_millis() as u64);

    reply
}
