//! WebSocket Message Types
//!
//! Defines all message types exchanged between browser clients and the
//! server, plus the domain events the rest of the application publishes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::error::HubError;
use crate::auth::UserId;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Bind an identity to this connection using a bearer token
    #[serde(rename = "AUTH", alias = "AUTH_WEBSOCKET")]
    Auth {
        /// The bearer credential
        payload: String,
    },
    /// Keepalive
    #[serde(rename = "PING")]
    Ping,
    /// Ask which identity this connection is bound to
    #[serde(rename = "WHOAMI")]
    WhoAmI,
    /// Any type this server does not understand
    #[serde(other)]
    Unknown,
}

/// Messages sent from server to client, other than domain events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Sent once right after the upgrade
    ConnectionEstablished {
        #[serde(rename = "socketId")]
        socket_id: String,
    },
    /// Handshake succeeded
    AuthSuccess {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    /// Reply to `WHOAMI`
    Identity {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    /// Reply to `PING`
    Pong,
    /// Something the client sent could not be handled
    Error { error: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Serialize into an outbound text frame
    pub fn to_outbound(&self) -> Result<Outbound, HubError> {
        let text = serde_json::to_string(self)?;
        Ok(Outbound::Frame(Arc::from(text)))
    }
}

/// Kind of committed mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    /// Value of the `type` field on the wire
    pub fn wire_type(self) -> &'static str {
        match self {
            EventKind::Created => "APPOINTMENT_CREATED",
            EventKind::Updated => "APPOINTMENT_UPDATED",
            EventKind::Deleted => "APPOINTMENT_DELETED",
        }
    }
}

/// A notification describing a committed mutation
///
/// `owner` scopes delivery to connections authenticated as that user.
/// `None` means the event is global.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEvent {
    pub kind: EventKind,
    pub owner: Option<UserId>,
    pub body: Value,
}

impl DomainEvent {
    pub fn new(kind: EventKind, owner: Option<UserId>, body: Value) -> Self {
        Self { kind, owner, body }
    }

    pub fn created(owner: UserId, body: Value) -> Self {
        Self::new(EventKind::Created, Some(owner), body)
    }

    pub fn updated(owner: UserId, body: Value) -> Self {
        Self::new(EventKind::Updated, Some(owner), body)
    }

    pub fn deleted(owner: UserId, body: Value) -> Self {
        Self::new(EventKind::Deleted, Some(owner), body)
    }

    /// An event delivered to every connection
    pub fn global(kind: EventKind, body: Value) -> Self {
        Self::new(kind, None, body)
    }

    /// Wire representation of this event
    pub fn frame(&self) -> EventFrame {
        EventFrame {
            kind: self.kind.wire_type().to_string(),
            payload: self.body.clone(),
        }
    }
}

/// Wire shape of a domain event: `{"type": "...", "payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

/// Items queued on a connection's transport
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Pre-serialized text frame, shared between recipients
    Frame(Arc<str>),
    /// Send a close frame and stop writing
    Close(CloseReason),
}

/// Why the server closed a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Server shutting down
    GoingAway,
    /// Credential rejected during the handshake
    AuthenticationFailed,
    /// No credential before the grace period ended
    AuthenticationTimeout,
}

impl CloseReason {
    pub fn code(self) -> u16 {
        match self {
            CloseReason::GoingAway => 1001,
            CloseReason::AuthenticationFailed => 4001,
            CloseReason::AuthenticationTimeout => 4008,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::GoingAway => "GoingAway",
            CloseReason::AuthenticationFailed => "AuthenticationFailed",
            CloseReason::AuthenticationTimeout => "AuthenticationTimeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_deserialize_auth() {
        let json = r#"{"type": "AUTH", "payload": "token-123"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Auth {
                payload: "token-123".to_string()
            }
        );
    }

    #[test]
    fn test_client_message_legacy_auth_type() {
        let json = r#"{"type": "AUTH_WEBSOCKET", "payload": "token-123"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Auth { .. }));
    }

    #[test]
    fn test_client_message_unknown_type() {
        let json = r#"{"type": "SUBSCRIBE_FILTER", "payload": {"day": "monday"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, ClientMessage::Unknown);
    }

    #[test]
    fn test_client_message_malformed() {
        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"payload": "x"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "AUTH"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "AUTH", "payload": 7}"#).is_err());
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::ConnectionEstablished {
            socket_id: "ws-abc".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "CONNECTION_ESTABLISHED", "socketId": "ws-abc"})
        );
    }

    #[test]
    fn test_server_message_serialize_error_and_auth() {
        let value = serde_json::to_value(ServerMessage::error("Authentication failed")).unwrap();
        assert_eq!(value, json!({"type": "ERROR", "error": "Authentication failed"}));

        let value = serde_json::to_value(ServerMessage::AuthSuccess {
            user_id: UserId::new("u1"),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "AUTH_SUCCESS", "userId": "u1"}));

        let value = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(value, json!({"type": "PONG"}));
    }

    #[test]
    fn test_event_frame_shape() {
        let event = DomainEvent::deleted(UserId::new("u1"), json!({"id": "appt-1", "userId": "u1"}));
        let value = serde_json::to_value(event.frame()).unwrap();
        assert_eq!(
            value,
            json!({"type": "APPOINTMENT_DELETED", "payload": {"id": "appt-1", "userId": "u1"}})
        );
    }

    #[test]
    fn test_close_reasons_are_distinct() {
        assert_eq!(CloseReason::GoingAway.code(), 1001);
        assert_eq!(CloseReason::AuthenticationFailed.as_str(), "AuthenticationFailed");
        assert_ne!(
            CloseReason::AuthenticationFailed.code(),
            CloseReason::AuthenticationTimeout.code()
        );
    }
}
