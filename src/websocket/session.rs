//! Per-connection session
//!
//! Runs the authentication handshake and answers client messages for one
//! registered connection. Replies go through the registry so they share the
//! connection's ordered transport with broadcasts.

use std::sync::Arc;

use super::error::HubError;
use super::messages::{ClientMessage, CloseReason, Outbound, ServerMessage};
use super::registry::{ConnectionId, ConnectionRegistry};
use crate::auth::{TokenVerifier, UserId};

/// What the socket loop should do after a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Handshake and message handling for one connection
pub struct Session {
    id: ConnectionId,
    registry: Arc<ConnectionRegistry>,
    verifier: Arc<dyn TokenVerifier>,
    identity: Option<UserId>,
}

impl Session {
    pub fn new(
        id: ConnectionId,
        registry: Arc<ConnectionRegistry>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            id,
            registry,
            verifier,
            identity: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Tell the client its connection id
    pub async fn greet(&self) -> Result<(), HubError> {
        self.reply(ServerMessage::ConnectionEstablished {
            socket_id: self.id.clone(),
        })
        .await
    }

    /// Handle one inbound text frame
    pub async fn handle_text(&mut self, text: &str) -> Flow {
        let result = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.dispatch(message).await,
            Err(e) => Err(HubError::MalformedMessage(e.to_string())),
        };

        match result {
            Ok(()) => Flow::Continue,
            Err(e) => self.fail(e).await,
        }
    }

    /// Handle one inbound binary frame
    pub async fn handle_binary(&mut self) -> Flow {
        self.fail(HubError::MalformedMessage(
            "binary messages are not supported".to_string(),
        ))
        .await
    }

    /// The grace period ended without a successful handshake
    pub async fn expire(&mut self) {
        tracing::info!(connection_id = %self.id, "WebSocket authentication timed out");
        self.terminate(CloseReason::AuthenticationTimeout).await;
    }

    async fn dispatch(&mut self, message: ClientMessage) -> Result<(), HubError> {
        match message {
            ClientMessage::Auth { payload } => self.authenticate(&payload).await,
            ClientMessage::Ping => self.reply(ServerMessage::Pong).await,
            ClientMessage::WhoAmI => {
                let user_id = self.identity.clone().ok_or(HubError::Unauthenticated)?;
                self.reply(ServerMessage::Identity { user_id }).await
            }
            ClientMessage::Unknown => {
                tracing::debug!(connection_id = %self.id, "Ignoring unrecognized message type");
                Ok(())
            }
        }
    }

    async fn authenticate(&mut self, credential: &str) -> Result<(), HubError> {
        let user_id = self
            .verifier
            .verify(credential)
            .await
            .map_err(|e| HubError::AuthenticationFailed(e.to_string()))?;

        self.registry
            .attach_identity(&self.id, user_id.clone())
            .await?;
        self.identity = Some(user_id.clone());

        self.reply(ServerMessage::AuthSuccess { user_id }).await
    }

    /// Answer an error; only authentication failures and a vanished
    /// registry entry end the connection
    async fn fail(&mut self, error: HubError) -> Flow {
        match error {
            HubError::ConnectionGone(_) => Flow::Close,
            HubError::AuthenticationFailed(reason) => {
                tracing::warn!(connection_id = %self.id, reason = %reason, "WebSocket authentication failed");
                self.reply_quietly(ServerMessage::error("Authentication failed"))
                    .await;
                self.terminate(CloseReason::AuthenticationFailed).await;
                Flow::Close
            }
            other => {
                tracing::debug!(connection_id = %self.id, error = %other, "Rejected client message");
                self.reply_quietly(ServerMessage::error(other.to_string()))
                    .await;
                Flow::Continue
            }
        }
    }

    /// Queue a close frame, then drop the registry entry
    async fn terminate(&self, reason: CloseReason) {
        if let Err(e) = self.registry.send_to(&self.id, Outbound::Close(reason)).await {
            tracing::debug!(connection_id = %self.id, error = %e, "Close frame not queued");
        }
        self.registry.remove(&self.id).await;
    }

    async fn reply(&self, message: ServerMessage) -> Result<(), HubError> {
        self.registry
            .send_to(&self.id, message.to_outbound()?)
            .await
    }

    async fn reply_quietly(&self, message: ServerMessage) {
        if let Err(e) = self.reply(message).await {
            tracing::debug!(connection_id = %self.id, error = %e, "Reply not delivered");
        }
    }
}
