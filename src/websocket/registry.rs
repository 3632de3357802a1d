//! WebSocket Connection Registry
//!
//! Authoritative map from connection id to connection state. The map is
//! only reachable through the methods below; every method takes the lock,
//! mutates or copies, and releases it before any send is attempted.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::error::HubError;
use super::messages::{CloseReason, Outbound};
use crate::auth::UserId;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Sending half of a connection's transport
pub type Transport = mpsc::UnboundedSender<Outbound>;

/// One live connection
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    /// Set once by a successful handshake
    pub identity: Option<UserId>,
    transport: Transport,
}

impl Connection {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Queue an item on this connection's transport
    pub fn send(&self, outbound: Outbound) -> Result<(), HubError> {
        self.transport
            .send(outbound)
            .map_err(|_| HubError::DeliveryFailure(self.id.clone()))
    }
}

/// Tracks live connections and their bound identities
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new, unauthenticated connection and return its id
    pub async fn register(&self, transport: Transport) -> ConnectionId {
        let mut connections = self.connections.write().await;

        let id = loop {
            let candidate = format!("ws-{}", Uuid::new_v4());
            if let Entry::Vacant(slot) = connections.entry(candidate.clone()) {
                slot.insert(Connection {
                    id: candidate.clone(),
                    identity: None,
                    transport,
                });
                break candidate;
            }
        };

        tracing::info!(
            connection_id = %id,
            total = connections.len(),
            "WebSocket connected"
        );
        id
    }

    /// Bind an identity to a connection
    ///
    /// Binding the same identity again is a no-op. A connection already bound
    /// to a different identity keeps it and the call fails with
    /// [`HubError::IdentityAlreadyBound`].
    pub async fn attach_identity(&self, id: &str, identity: UserId) -> Result<(), HubError> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(id)
            .ok_or_else(|| HubError::ConnectionGone(id.to_string()))?;

        match &connection.identity {
            Some(existing) if *existing == identity => Ok(()),
            Some(_) => Err(HubError::IdentityAlreadyBound),
            None => {
                tracing::info!(connection_id = %id, user_id = %identity, "WebSocket authenticated");
                connection.identity = Some(identity);
                Ok(())
            }
        }
    }

    /// Remove a connection; returns whether it was present
    pub async fn remove(&self, id: &str) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(id).is_some();

        if removed {
            tracing::info!(
                connection_id = %id,
                total = connections.len(),
                "WebSocket disconnected"
            );
        }
        removed
    }

    /// Point-in-time copy of every registered connection
    pub async fn snapshot(&self) -> Vec<Connection> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Queue an item for a single connection
    pub async fn send_to(&self, id: &str, outbound: Outbound) -> Result<(), HubError> {
        let connection = self
            .connections
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::ConnectionGone(id.to_string()))?;

        connection.send(outbound)
    }

    /// Identity bound to a connection, if any
    pub async fn identity_of(&self, id: &str) -> Result<Option<UserId>, HubError> {
        self.connections
            .read()
            .await
            .get(id)
            .map(|c| c.identity.clone())
            .ok_or_else(|| HubError::ConnectionGone(id.to_string()))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.connections.read().await.contains_key(id)
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Close and remove every connection; returns how many were closed
    pub async fn close_all(&self, reason: CloseReason) -> usize {
        let drained: Vec<Connection> = {
            let mut connections = self.connections.write().await;
            connections.drain().map(|(_, c)| c).collect()
        };

        for connection in &drained {
            if let Err(e) = connection.send(Outbound::Close(reason)) {
                tracing::debug!(error = %e, "Close frame not queued");
            }
        }

        tracing::info!(closed = drained.len(), reason = reason.as_str(), "Closed all WebSocket connections");
        drained.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn transport() -> (Transport, mpsc::UnboundedReceiver<Outbound>) {
        mpsc::unbounded_channel()
    }

    async fn member_ids(registry: &ConnectionRegistry) -> HashSet<ConnectionId> {
        registry.snapshot().await.into_iter().map(|c| c.id).collect()
    }

    #[tokio::test]
    async fn test_register_remove() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = transport();

        let id = registry.register(tx).await;
        assert!(id.starts_with("ws-"));
        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(registry.identity_of(&id).await.unwrap(), None);

        assert!(registry.remove(&id).await);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = transport();
        let id = registry.register(tx).await;

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(!registry.remove("ws-never-existed").await);
    }

    #[tokio::test]
    async fn test_membership_tracks_register_remove_sequence() {
        let registry = ConnectionRegistry::new();
        let mut expected = HashSet::new();
        let mut receivers = Vec::new();

        for round in 0..20 {
            let (tx, rx) = transport();
            receivers.push(rx);
            expected.insert(registry.register(tx).await);

            if round % 3 == 2 {
                let victim = expected.iter().next().cloned().unwrap();
                registry.remove(&victim).await;
                // removing twice must not disturb the rest
                registry.remove(&victim).await;
                expected.remove(&victim);
            }

            assert_eq!(member_ids(&registry).await, expected);
            assert_eq!(registry.connection_count().await, expected.len());
        }
    }

    #[tokio::test]
    async fn test_concurrent_registrations_get_unique_ids() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();

        for _ in 0..50 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let (tx, rx) = transport();
                (registry.register(tx).await, rx)
            }));
        }

        let mut ids = HashSet::new();
        let mut receivers = Vec::new();
        for handle in handles {
            let (id, rx) = handle.await.unwrap();
            ids.insert(id);
            receivers.push(rx);
        }

        assert_eq!(ids.len(), 50);
        assert_eq!(registry.connection_count().await, 50);
    }

    #[tokio::test]
    async fn test_attach_identity_same_twice_is_noop() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = transport();
        let id = registry.register(tx).await;

        registry.attach_identity(&id, UserId::new("u1")).await.unwrap();
        registry.attach_identity(&id, UserId::new("u1")).await.unwrap();

        assert_eq!(
            registry.identity_of(&id).await.unwrap(),
            Some(UserId::new("u1"))
        );
    }

    #[tokio::test]
    async fn test_attach_identity_never_overwrites() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = transport();
        let id = registry.register(tx).await;

        registry.attach_identity(&id, UserId::new("u1")).await.unwrap();
        let result = registry.attach_identity(&id, UserId::new("u2")).await;

        assert!(matches!(result, Err(HubError::IdentityAlreadyBound)));
        assert_eq!(
            registry.identity_of(&id).await.unwrap(),
            Some(UserId::new("u1"))
        );
    }

    #[tokio::test]
    async fn test_attach_identity_to_gone_connection() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = transport();
        let id = registry.register(tx).await;
        registry.remove(&id).await;

        let result = registry.attach_identity(&id, UserId::new("u1")).await;
        assert!(matches!(result, Err(HubError::ConnectionGone(_))));
        assert!(!registry.contains(&id).await);
    }

    #[tokio::test]
    async fn test_snapshot_excludes_later_registrations() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = transport();
        let first = registry.register(tx1).await;

        let snapshot = registry.snapshot().await;

        let (tx2, _rx2) = transport();
        registry.register(tx2).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, first);
        assert!(!snapshot[0].is_authenticated());
    }

    #[tokio::test]
    async fn test_send_to() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = transport();
        let id = registry.register(tx).await;

        let frame = Outbound::Frame(Arc::from("{\"type\":\"PONG\"}"));
        registry.send_to(&id, frame.clone()).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), frame);

        registry.remove(&id).await;
        let result = registry.send_to(&id, frame).await;
        assert!(matches!(result, Err(HubError::ConnectionGone(_))));
    }

    #[tokio::test]
    async fn test_send_to_dropped_transport() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = transport();
        let id = registry.register(tx).await;
        drop(rx);

        let result = registry.send_to(&id, Outbound::Close(CloseReason::GoingAway)).await;
        assert!(matches!(result, Err(HubError::DeliveryFailure(_))));
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = transport();
        let (tx2, rx2) = transport();
        registry.register(tx1).await;
        registry.register(tx2).await;
        drop(rx2);

        let closed = registry.close_all(CloseReason::GoingAway).await;

        assert_eq!(closed, 2);
        assert_eq!(registry.connection_count().await, 0);
        assert_eq!(
            rx1.try_recv().unwrap(),
            Outbound::Close(CloseReason::GoingAway)
        );
    }
}
