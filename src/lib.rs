//! # Agenda
//!
//! Appointment booking server with bearer-token auth and live WebSocket
//! updates.
//!
//! ## Features
//!
//! - **REST API**: login, registration and per-user appointment CRUD
//! - **Shared credentials**: one JWT verifier for HTTP and WebSocket
//! - **Real-time**: committed changes are pushed to the owner's open sockets
//!
//! ## Modules
//!
//! - [`auth`]: Token issuing and verification
//! - [`store`]: In-memory users and appointments
//! - [`websocket`]: Connection registry, handshake and event routing
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agenda::{serve, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     serve(AppState::new(config)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use api::{build_router, serve, serve_on, ApiError, AppState};

pub use auth::{AuthError, Claims, JwtTokens, TokenVerifier, UserId};

pub use config::{ApiConfig, AuthConfig, Config, ConfigError, LoggingConfig, WebSocketConfig};

pub use store::{Appointment, AppointmentStore, StoreError, User, UserStore};

pub use websocket::{
    BroadcastReport, Broadcaster, ClientMessage, CloseReason, ConnectionRegistry, DomainEvent,
    EventKind, HubError, ServerMessage, websocket_handler,
};
