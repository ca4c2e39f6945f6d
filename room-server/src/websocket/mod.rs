use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::auth::AuthService;
use crate::room_manager::RoomManager;
use room_types::{ClientMessage, ServerMessage};

pub mod connection;
pub mod handlers;
pub mod rate_limiter;

pub use connection::{Connection, ConnectionId, ConnectionManager, SendError};
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

/// Serve one socket until either half closes. The player stays in their room
/// afterwards; only the registry entry goes away.
pub async fn handle_connection(
    websocket: WebSocket,
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
) {
    let connection_id = ConnectionId::new();
    info!("Socket {} opened", connection_id);

    let (sink, stream) = websocket.split();
    let outbox = connection_manager.register(connection_id).await;
    let handler = MessageHandler::new(
        connection_id,
        connection_manager.clone(),
        room_manager,
        auth_service,
    );

    tokio::select! {
        _ = read_pump(stream, &handler, connection_id) => {},
        _ = write_pump(sink, outbox, connection_id) => {},
    }

    handler.handle_disconnect().await;
    connection_manager.unregister(connection_id).await;
    info!("Socket {} closed", connection_id);
}

async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    handler: &MessageHandler,
    connection_id: ConnectionId,
) {
    let mut limiter = RateLimiter::new();
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Socket {} read failed: {}", connection_id, e);
                return;
            }
        };
        if frame.is_close() {
            debug!("Socket {} sent close", connection_id);
            return;
        }
        if !limiter.try_acquire() {
            warn!("Socket {} exceeded the message rate", connection_id);
            return;
        }
        let Some(message) = decode(&frame, connection_id) else {
            continue;
        };
        if let Err(e) = handler.handle_message(message).await {
            error!("Socket {} can no longer be served: {}", connection_id, e);
            return;
        }
    }
}

async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbox: UnboundedReceiver<ServerMessage>,
    connection_id: ConnectionId,
) {
    while let Some(message) = outbox.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!("Could not encode {:?}: {}", message, e);
                continue;
            }
        };
        if let Err(e) = sink.send(Message::text(text)).await {
            warn!("Socket {} write failed: {}", connection_id, e);
            return;
        }
    }
    let _ = sink.close().await;
}

/// Text frames carrying a well-formed client message; anything else is
/// skipped without closing the socket.
fn decode(frame: &Message, connection_id: ConnectionId) -> Option<ClientMessage> {
    let text = frame.to_str().ok()?;
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Socket {} sent an unreadable message: {}", connection_id, e);
            None
        }
    }
}
