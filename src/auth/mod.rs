//! Identity Verification
//!
//! Bearer credentials are JWTs signed with a shared HS256 secret. A single
//! [`TokenVerifier`] is injected into both the HTTP bearer extractor and the
//! WebSocket handshake so credential format and expiry rules live here only.

mod jwt;

pub use jwt::{Claims, JwtTokens};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Authenticated owner id bound to requests and connections
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Verifies an opaque bearer credential and resolves it to a user id
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<UserId, AuthError>;
}

/// Errors produced while issuing or verifying credentials
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signature, format or claim validation failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token was valid but its `exp` has passed
    #[error("Token expired")]
    Expired,

    /// Token could not be signed
    #[error("Failed to sign token: {0}")]
    Signing(String),
}
