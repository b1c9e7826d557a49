//! Broadcast + history bus for registry lifecycle events.

use std::{
    collections::VecDeque,
    sync::RwLock,
};

use futures::StreamExt;
use mds_status_core::ClientId;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Number of past events retained for late subscribers.
const HISTORY_LIMIT: usize = 1024;

/// A registry lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A session connected.
    Connected { id: ClientId },
    /// A session heartbeat arrived.
    Renewed { id: ClientId },
    /// A session closed gracefully.
    Disconnected { id: ClientId },
    /// A session was evicted by the autoclose sweep.
    Evicted { id: ClientId, idle_ms: u64 },
}

/// Event bus with broadcast and bounded history.
///
/// A clients-view that attaches late receives recent history, then
/// switches to live updates.
pub struct EventBus {
    history: RwLock<VecDeque<RegistryEvent>>,
    sender: broadcast::Sender<RegistryEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new event bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            history: RwLock::new(VecDeque::with_capacity(32)),
            sender,
        }
    }

    /// Publish an event to live subscribers and the history buffer.
    pub fn push(&self, event: RegistryEvent) {
        let _ = self.sender.send(event.clone()); // live listeners

        let mut history = self.history.write().unwrap();
        while history.len() >= HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(event);
    }

    /// Get a receiver for live events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    /// Snapshot of retained history.
    #[must_use]
    pub fn history(&self) -> Vec<RegistryEvent> {
        self.history.read().unwrap().iter().cloned().collect()
    }

    /// Stream that yields history first, then live events.
    #[must_use]
    pub fn history_plus_stream(&self) -> futures::stream::BoxStream<'static, RegistryEvent> {
        let (history, rx) = (self.history(), self.subscribe());

        let hist = futures::stream::iter(history);
        let live = BroadcastStream::new(rx).filter_map(|res| async move { res.ok() });

        Box::pin(hist.chain(live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn id(s: &str) -> ClientId {
        ClientId::from(s)
    }

    #[test]
    fn history_is_retained_in_order() {
        let bus = EventBus::new();
        bus.push(RegistryEvent::Connected { id: id("client.a") });
        bus.push(RegistryEvent::Renewed { id: id("client.a") });

        assert_eq!(
            bus.history(),
            vec![
                RegistryEvent::Connected { id: id("client.a") },
                RegistryEvent::Renewed { id: id("client.a") },
            ]
        );
    }

    #[test]
    fn history_is_bounded() {
        let bus = EventBus::new();
        for _ in 0..(HISTORY_LIMIT + 10) {
            bus.push(RegistryEvent::Renewed { id: id("client.a") });
        }
        assert_eq!(bus.history().len(), HISTORY_LIMIT);
    }

    #[tokio::test]
    async fn subscribers_receive_live_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.push(RegistryEvent::Evicted {
            id: id("client.b"),
            idle_ms: 90_000,
        });

        let event = assert_ok!(rx.recv().await);
        assert_eq!(
            event,
            RegistryEvent::Evicted {
                id: id("client.b"),
                idle_ms: 90_000,
            }
        );
    }

    #[tokio::test]
    async fn stream_yields_history_then_live() {
        let bus = EventBus::new();
        bus.push(RegistryEvent::Connected { id: id("client.a") });

        let mut stream = bus.history_plus_stream();
        bus.push(RegistryEvent::Disconnected { id: id("client.a") });

        assert_eq!(
            stream.next().await,
            Some(RegistryEvent::Connected { id: id("client.a") })
        );
        assert_eq!(
            stream.next().await,
            Some(RegistryEvent::Disconnected { id: id("client.a") })
        );
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&RegistryEvent::Evicted {
            id: id("client.b"),
            idle_ms: 1_500,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"evicted\""));
        assert!(json.contains("client.b"));
    }
}
