//! Event Broadcaster
//!
//! Routes domain events to the connections allowed to see them. Events
//! with an owner go only to connections authenticated as that owner;
//! events without one go to every connection. Delivery is best-effort and
//! at-most-once.

use std::sync::Arc;

use super::messages::{DomainEvent, Outbound};
use super::registry::{Connection, ConnectionRegistry};

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the event was queued for
    pub delivered: usize,
    /// Targets whose transport was already closed
    pub failed: usize,
}

/// Publishes domain events to connected clients
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver an event to every eligible connection
    ///
    /// Called after a mutation commits. The event is serialized once and the
    /// same frame is queued for each target. A closed transport is logged
    /// and skipped; it never stops delivery to the remaining targets.
    pub async fn publish(&self, event: DomainEvent) -> BroadcastReport {
        let frame = match serde_json::to_string(&event.frame()) {
            Ok(text) => Outbound::Frame(Arc::from(text)),
            Err(e) => {
                tracing::error!(error = %e, kind = ?event.kind, "Failed to serialize event");
                return BroadcastReport::default();
            }
        };

        let mut report = BroadcastReport::default();
        for connection in self.registry.snapshot().await {
            if !should_deliver(&event, &connection) {
                continue;
            }

            match connection.send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping closed connection");
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            event_type = event.kind.wire_type(),
            owner = ?event.owner.as_ref().map(|o| o.as_str()),
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast event"
        );
        report
    }
}

/// Whether `connection` may receive `event`
pub fn should_deliver(event: &DomainEvent, connection: &Connection) -> bool {
    match &event.owner {
        Some(owner) => connection.identity.as_ref() == Some(owner),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserId;
    use crate::websocket::messages::{EventFrame, EventKind};
    use crate::websocket::registry::Transport;
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Client {
        id: String,
        rx: UnboundedReceiver<Outbound>,
    }

    impl Client {
        fn frames(&mut self) -> Vec<EventFrame> {
            let mut frames = Vec::new();
            while let Ok(outbound) = self.rx.try_recv() {
                if let Outbound::Frame(text) = outbound {
                    frames.push(serde_json::from_str(&text).unwrap());
                }
            }
            frames
        }
    }

    async fn connect(registry: &ConnectionRegistry, identity: Option<&str>) -> Client {
        let (tx, rx): (Transport, _) = mpsc::unbounded_channel();
        let id = registry.register(tx).await;
        if let Some(user) = identity {
            registry.attach_identity(&id, UserId::new(user)).await.unwrap();
        }
        Client { id, rx }
    }

    /// A unauthenticated, B as u1, C as u2
    async fn three_clients() -> (Broadcaster, Client, Client, Client) {
        let registry = Arc::new(ConnectionRegistry::new());
        let a = connect(&registry, None).await;
        let b = connect(&registry, Some("u1")).await;
        let c = connect(&registry, Some("u2")).await;
        (Broadcaster::new(registry), a, b, c)
    }

    #[tokio::test]
    async fn test_owned_event_reaches_only_owner() {
        let (broadcaster, mut a, mut b, mut c) = three_clients().await;

        let report = broadcaster
            .publish(DomainEvent::updated(UserId::new("u1"), json!({"id": "appt-1"})))
            .await;

        assert_eq!(report, BroadcastReport { delivered: 1, failed: 0 });
        assert!(a.frames().is_empty());
        assert_eq!(b.frames().len(), 1);
        assert!(c.frames().is_empty());
    }

    #[tokio::test]
    async fn test_global_event_reaches_everyone() {
        let (broadcaster, mut a, mut b, mut c) = three_clients().await;

        let report = broadcaster
            .publish(DomainEvent::global(EventKind::Deleted, json!({"id": "appt-1"})))
            .await;

        assert_eq!(report.delivered, 3);
        for client in [&mut a, &mut b, &mut c] {
            let frames = client.frames();
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0].kind, "APPOINTMENT_DELETED");
        }
    }

    #[tokio::test]
    async fn test_owner_scoping_ignores_unrelated_connections() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut owners = Vec::new();
        let mut others = Vec::new();

        for i in 0..30 {
            let user = format!("other-{}", i % 7);
            others.push(connect(&registry, Some(&user)).await);
            others.push(connect(&registry, None).await);
            if i % 10 == 0 {
                owners.push(connect(&registry, Some("owner")).await);
            }
        }

        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let report = broadcaster
            .publish(DomainEvent::created(UserId::new("owner"), json!({"id": "x"})))
            .await;

        assert_eq!(report.delivered, owners.len());
        for owner in &mut owners {
            assert_eq!(owner.frames().len(), 1);
        }
        for other in &mut others {
            assert!(other.frames().is_empty());
        }
    }

    #[tokio::test]
    async fn test_removed_connection_is_never_targeted() {
        let (broadcaster, mut a, mut b, _c) = three_clients().await;
        broadcaster.registry().remove(&b.id).await;

        let report = broadcaster
            .publish(DomainEvent::global(EventKind::Created, json!({})))
            .await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(a.frames().len(), 1);
        assert!(b.frames().is_empty());
    }

    #[tokio::test]
    async fn test_closed_transport_does_not_abort_broadcast() {
        let (broadcaster, a, mut b, mut c) = three_clients().await;
        // A's socket writer went away but the entry is not removed yet
        drop(a);

        let report = broadcaster
            .publish(DomainEvent::global(EventKind::Updated, json!({"n": 1})))
            .await;

        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });
        assert_eq!(b.frames().len(), 1);
        assert_eq!(c.frames().len(), 1);
    }

    #[tokio::test]
    async fn test_frame_serialized_once_and_shared() {
        let (broadcaster, mut a, mut b, _c) = three_clients().await;

        broadcaster
            .publish(DomainEvent::global(EventKind::Created, json!({"id": "shared"})))
            .await;

        let (Ok(Outbound::Frame(first)), Ok(Outbound::Frame(second))) =
            (a.rx.try_recv(), b.rx.try_recv())
        else {
            panic!("Expected frames for A and B");
        };
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_per_connection_order_matches_publish_order() {
        let (broadcaster, _a, mut b, _c) = three_clients().await;

        for n in 0..10 {
            broadcaster
                .publish(DomainEvent::updated(UserId::new("u1"), json!({"seq": n})))
                .await;
        }

        let seqs: Vec<i64> = b
            .frames()
            .iter()
            .map(|f| f.payload["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_payload_round_trip() {
        let (broadcaster, _a, mut b, _c) = three_clients().await;
        let body = json!({
            "id": "appt-9",
            "userId": "u1",
            "title": "Dentist",
            "description": null,
            "startTime": "2026-03-01T09:00:00Z",
            "tags": ["health", 3, true],
        });

        broadcaster
            .publish(DomainEvent::created(UserId::new("u1"), body.clone()))
            .await;

        let frames = b.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, "APPOINTMENT_CREATED");
        assert_eq!(frames[0].payload, body);
    }

    #[tokio::test]
    async fn test_removal_concurrent_with_broadcast() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut clients = Vec::new();
        for _ in 0..100 {
            clients.push(connect(&registry, None).await);
        }
        let ids: Vec<String> = clients.iter().map(|c| c.id.clone()).collect();
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let remover = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for id in ids {
                    registry.remove(&id).await;
                    tokio::task::yield_now().await;
                }
            })
        };
        let publisher = tokio::spawn(async move {
            let mut total = BroadcastReport::default();
            for _ in 0..20 {
                let report = broadcaster
                    .publish(DomainEvent::global(EventKind::Updated, json!({})))
                    .await;
                total.delivered += report.delivered;
                total.failed += report.failed;
                tokio::task::yield_now().await;
            }
            total
        });

        remover.await.unwrap();
        let total = publisher.await.unwrap();

        assert_eq!(total.failed, 0);
        assert_eq!(registry.connection_count().await, 0);
    }
}
