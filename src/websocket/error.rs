//! Hub error types

use thiserror::Error;

/// Errors that can occur in the real-time hub
///
/// All of these are scoped to a single connection; none of them should
/// stop a broadcast or take down the registry.
#[derive(Debug, Error)]
pub enum HubError {
    /// The connection is no longer registered
    #[error("Connection {0} is gone")]
    ConnectionGone(String),

    /// A different identity is already bound to the connection
    #[error("Connection is already authenticated as another user")]
    IdentityAlreadyBound,

    /// Credential verification rejected the token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Message requires an identity but the handshake has not completed
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Inbound message failed to parse or validate
    #[error("Invalid message format: {0}")]
    MalformedMessage(String),

    /// The transport for a single target is closed
    #[error("Failed to deliver to connection {0}")]
    DeliveryFailure(String),

    /// Outbound message could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Serialization(err.to_string())
    }
}
