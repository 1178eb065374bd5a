use crate::network::events::ClientMessage;
use crate::network::hub::ClientHandle;
use crate::network::server::AppState;
use crate::session::SessionManager;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SHUTDOWN_REASON: &str = "Server shutdown";

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = state.configuration.max_message_bytes;
    let buffer = state.configuration.client_buffer;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| handle_socket(socket, state.session, buffer))
}

/// Drives one browser connection from registration to cleanup.
///
/// Outbound events flow through the client's channel into a writer task; inbound messages
/// are handled here one at a time, each to completion.
pub async fn handle_socket(socket: WebSocket, session: Arc<SessionManager>, buffer: usize) {
    let (mut sender, mut receiver) = socket.split();
    let (client, mut rx) = ClientHandle::channel(buffer);
    let client_id = client.id();
    info!(client_id = %client_id, "WebSocket client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                return;
            }
        }
        // The hub dropped this client, which only happens when the server shuts down.
        let close = CloseFrame {
            code: close_code::RESTART,
            reason: SHUTDOWN_REASON.into(),
        };
        let _ = sender.send(Message::Close(Some(close))).await;
    });

    session.connect(client).await;

    loop {
        tokio::select! {
            _ = &mut send_task => {
                debug!(client_id = %client_id, "Writer finished");
                break;
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => match ClientMessage::parse(&text) {
                    Ok(message) => session.handle_message(client_id, message).await,
                    Err(e) => warn!(client_id = %client_id, "Ignoring malformed message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(client_id = %client_id, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    session.disconnect(client_id).await;
    send_task.abort();
    info!(client_id = %client_id, "WebSocket client disconnected");
}
