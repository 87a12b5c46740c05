use dashmap::DashMap;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::Event;

/// Registry of live observers (connected dashboards). Holds its own
/// synchronization and shares no lock with the order mutation path.
///
/// Delivery is at-most-once and best-effort: with no observers connected an
/// event is simply dropped, and a dead observer is evicted without touching
/// the others. There is no backlog or replay; a fresh observer reconciles by
/// re-fetching.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    observers: DashMap<Uuid, mpsc::UnboundedSender<String>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new observer and returns its handle plus the message
    /// stream to forward to the connection.
    pub fn subscribe(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.insert(id, tx);
        debug!(observer_id = %id, total = self.observers.len(), "Observer connected");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: Uuid) {
        if self.observers.remove(&id).is_some() {
            debug!(observer_id = %id, total = self.observers.len(), "Observer disconnected");
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Message sent once to every observer right after it connects.
    pub fn connection_ack() -> String {
        json!({
            "type": "connection_established",
            "message": "Connected to order updates",
        })
        .to_string()
    }

    /// Fans `event` out to every live observer. Returns how many observers
    /// the message was handed to; observers whose channel is gone are
    /// evicted on the way.
    pub fn broadcast(&self, event: &Event) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize event for broadcast");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();

        for entry in self.observers.iter() {
            if entry.value().send(payload.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*entry.key());
            }
        }

        for id in dead {
            self.unsubscribe(id);
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deleted_event() -> Event {
        Event::OrderDeleted {
            order_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_observer() {
        let registry = ObserverRegistry::new();
        let (_id_a, mut rx_a) = registry.subscribe();
        let (_id_b, mut rx_b) = registry.subscribe();

        let delivered = registry.broadcast(&deleted_event());
        assert_eq!(delivered, 2);

        let msg_a = rx_a.recv().await.unwrap();
        let msg_b = rx_b.recv().await.unwrap();
        assert_eq!(msg_a, msg_b);
        assert!(msg_a.contains("\"type\":\"deleted\""));
    }

    #[tokio::test]
    async fn broadcast_without_observers_is_a_noop() {
        let registry = ObserverRegistry::new();
        assert_eq!(registry.broadcast(&deleted_event()), 0);
    }

    #[tokio::test]
    async fn dead_observers_are_evicted_without_affecting_others() {
        let registry = ObserverRegistry::new();
        let (_id_live, mut rx_live) = registry.subscribe();
        let (_id_dead, rx_dead) = registry.subscribe();
        drop(rx_dead);

        let delivered = registry.broadcast(&deleted_event());
        assert_eq!(delivered, 1);
        assert_eq!(registry.observer_count(), 1);
        assert!(rx_live.recv().await.is_some());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let registry = ObserverRegistry::new();
        let (id, mut rx) = registry.subscribe();
        registry.unsubscribe(id);

        assert_eq!(registry.broadcast(&deleted_event()), 0);
        assert!(rx.recv().await.is_none());
    }
}
