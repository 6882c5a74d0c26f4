use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::state::AppState;
use arena_types::{ClientMessage, ServerMessage};

pub mod connection;
pub mod handlers;
pub mod rate_limiter;

use connection::ConnectionId;
pub use connection::ConnectionManager;
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

pub async fn handle_connection(websocket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new();
    info!("New realtime connection: {}", connection_id);

    let (sink, stream) = websocket.split();
    let outbox = state.connections.create_connection(connection_id).await;
    let message_handler = MessageHandler::new(connection_id, state.clone());

    tokio::select! {
        _ = read_inbound(stream, &message_handler, connection_id) => {},
        _ = forward_outbox(outbox, sink, connection_id) => {},
    }

    info!("Connection {} disconnected", connection_id);
    message_handler.handle_disconnect().await;
    state.connections.remove_connection(connection_id).await;
}

/// Dispatch client frames until the socket fails, closes or misbehaves.
async fn read_inbound(
    mut stream: SplitStream<WebSocket>,
    message_handler: &MessageHandler,
    connection_id: ConnectionId,
) {
    let mut rate_limiter = RateLimiter::new();
    while let Some(frame) = stream.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket error for {}: {}", connection_id, e);
                return;
            }
        };
        if let Err(e) = handle_message(msg, &mut rate_limiter, message_handler, connection_id).await
        {
            error!("Error handling message for {}: {}", connection_id, e);
            return;
        }
    }
}

/// Serialize queued server messages onto the socket.
async fn forward_outbox(
    mut outbox: UnboundedReceiver<ServerMessage>,
    mut sink: SplitSink<WebSocket, Message>,
    connection_id: ConnectionId,
) {
    while let Some(message) = outbox.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize message: {:?}", e);
                continue;
            }
        };
        if let Err(e) = sink.send(Message::text(json)).await {
            warn!("Failed to send message to {}: {:?}", connection_id, e);
            return;
        }
    }
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    connection_id: ConnectionId,
) -> Result<(), String> {
    if !rate_limiter.check_rate_limit() {
        warn!("Rate limit exceeded for connection {}", connection_id);
        return Err("Rate limit exceeded".to_string());
    }

    if msg.is_close() {
        return Err("Client closed the connection".to_string());
    }
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message".to_string())?;
    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            // Malformed frames are reported but keep the connection open
            return message_handler
                .send_message(ServerMessage::Error {
                    message: format!("Invalid message: {}", e),
                })
                .await;
        }
    };

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))
}
