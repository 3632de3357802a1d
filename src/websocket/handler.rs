//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::messages::Outbound;
use super::registry::ConnectionRegistry;
use super::session::{Flow, Session};
use crate::api::AppState;
use crate::auth::TokenVerifier;

/// How long queued frames may take to flush once the connection is ending
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let registry = Arc::clone(&state.registry);
    let verifier = Arc::clone(&state.verifier);
    let auth_timeout = state.config.websocket.auth_timeout();
    ws.on_upgrade(move |socket| handle_socket(socket, registry, verifier, auth_timeout))
}

/// Handle an established WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    registry: Arc<ConnectionRegistry>,
    verifier: Arc<dyn TokenVerifier>,
    auth_timeout: Duration,
) {
    let (mut sender, mut receiver) = socket.split();

    // Everything written to this socket goes through this channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let connection_id = registry.register(tx).await;

    let mut session = Session::new(connection_id.clone(), Arc::clone(&registry), verifier);
    if let Err(e) = session.greet().await {
        tracing::error!(connection_id = %connection_id, error = %e, "Failed to queue connected message");
        registry.remove(&connection_id).await;
        return;
    }

    let conn_id_for_send = connection_id.clone();

    // Task to forward queued frames to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Frame(text) => {
                    if sender.send(Message::Text(text.to_string())).await.is_err() {
                        tracing::debug!(
                            connection_id = %conn_id_for_send,
                            "WebSocket send failed, closing connection"
                        );
                        break;
                    }
                }
                Outbound::Close(reason) => {
                    let frame = CloseFrame {
                        code: reason.code(),
                        reason: reason.as_str().into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    // Task to receive messages from the WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        let deadline = Instant::now() + auth_timeout;

        loop {
            let next = if session.is_authenticated() {
                receiver.next().await
            } else {
                match tokio::time::timeout_at(deadline, receiver.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        session.expire().await;
                        break;
                    }
                }
            };

            let flow = match next {
                Some(Ok(msg)) => handle_ws_message(&mut session, msg).await,
                Some(Err(e)) => {
                    tracing::debug!(
                        connection_id = %session.id(),
                        error = %e,
                        "WebSocket receive error"
                    );
                    Flow::Close
                }
                None => Flow::Close,
            };

            if flow == Flow::Close {
                break;
            }
        }
    });

    // Wait for either task to complete
    let send_finished = tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            true
        }
        _ = &mut recv_task => false,
    };

    // Cleanup: unregister, which drops the transport so the writer drains
    registry.remove(&connection_id).await;

    if !send_finished && tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
}

/// Handle a received WebSocket message
async fn handle_ws_message(session: &mut Session, message: Message) -> Flow {
    match message {
        Message::Text(text) => session.handle_text(&text).await,
        Message::Binary(_) => session.handle_binary().await,
        // Axum answers pings automatically
        Message::Ping(_) | Message::Pong(_) => Flow::Continue,
        Message::Close(_) => {
            tracing::debug!(connection_id = %session.id(), "Client requested close");
            Flow::Close
        }
    }
}
