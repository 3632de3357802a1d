//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{JwtTokens, TokenVerifier};
use crate::config::Config;
use crate::store::{AppointmentStore, UserStore};
use crate::websocket::{Broadcaster, ConnectionRegistry};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Full server configuration
    pub config: Arc<Config>,
    /// User accounts
    pub users: Arc<UserStore>,
    /// Appointment list
    pub appointments: Arc<AppointmentStore>,
    /// Token issuing for login and registration
    pub tokens: Arc<JwtTokens>,
    /// Credential verification shared by HTTP and WebSocket
    pub verifier: Arc<dyn TokenVerifier>,
    /// Live WebSocket connections
    pub registry: Arc<ConnectionRegistry>,
    /// Publishes committed mutations to WebSocket clients
    pub broadcaster: Broadcaster,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state with the seeded development user and no appointments
    pub fn new(config: Config) -> Self {
        let tokens = Arc::new(JwtTokens::from_config(&config.auth));
        let registry = Arc::new(ConnectionRegistry::new());

        Self {
            config: Arc::new(config),
            users: Arc::new(UserStore::seeded()),
            appointments: Arc::new(AppointmentStore::new()),
            verifier: Arc::clone(&tokens) as Arc<dyn TokenVerifier>,
            tokens,
            broadcaster: Broadcaster::new(Arc::clone(&registry)),
            registry,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.registry.connection_count().await
    }
}
