//! EventBus - pub/sub distribution of session events.

use std::sync::{Arc, RwLock};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use conswol_models::SessionEvent;

/// A live subscription to the bus.
///
/// Receives every event published after the subscription was created, in
/// publish order. Dropping the subscription unsubscribes; the sender side is
/// pruned on the next publish.
pub struct Subscription {
    rx: UnboundedReceiver<SessionEvent>,
}

impl Subscription {
    /// Waits for the next event. Returns `None` once the bus is dropped and
    /// all buffered events have been consumed.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Returns the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

/// Process-wide pub/sub channel for session events.
///
/// Each subscriber gets its own unbounded channel: a slow subscriber buffers
/// rather than stalling publishers or other subscribers. There is no replay
/// of history; a subscription sees only events published after it was
/// created.
///
/// # Concurrency
///
/// The subscriber list sits behind `Arc<RwLock<Vec<Sender>>>`: subscriptions
/// are added occasionally, broadcast happens on every publish. Cloning the
/// bus shares the same subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<UnboundedSender<SessionEvent>>>>,
}

impl EventBus {
    /// Creates a new bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to events published from this point on.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Ok(mut subs) = self.subscribers.write() {
            subs.push(tx);
        }

        Subscription { rx }
    }

    /// Publishes an event to all live subscribers.
    ///
    /// Disconnected subscribers (dropped receivers) are removed. Publishing
    /// with no subscribers is a no-op.
    pub fn publish(&self, event: SessionEvent) {
        trace!(session_id = %event.session_id(), "publishing event");

        if let Ok(mut subs) = self.subscribers.write() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Returns the number of live subscribers at the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|subs| subs.len()).unwrap_or(0)
    }
}
