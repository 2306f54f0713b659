//! Session-level events published by the network layer.
//!
//! DESIGN
//! ======
//! The API client never touches navigation or the session itself. When the
//! server rejects a request with 401 it publishes [`ApiEvent::SessionExpired`]
//! here; the composition root (`App`) subscribes and performs the teardown
//! and redirect.
//!
//! Delivery is asynchronous, so an event can arrive after the session it
//! refers to has been replaced. Each event names the token that was rejected
//! and subscribers only act while that token is still the stored one.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

/// Events emitted by the API client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiEvent {
    /// The server answered 401 for `endpoint`. `rejected_token` is the
    /// bearer token the request carried, `None` if it was sent without one.
    SessionExpired { endpoint: String, rejected_token: Option<String> },
}

/// Broadcast hub for [`ApiEvent`]s. Cloning shares the same channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ApiEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ApiEvent) {
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::debug!(receivers, "api event published");
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ApiEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
