//! Lifecycle event bus.
//!
//! A thin wrapper over `tokio::sync::broadcast`: every subscriber receives
//! every [`LifecycleEvent`] published after it subscribed.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::LifecycleEvent;

/// Number of events a slow subscriber may fall behind before it starts
/// missing events.
const BUS_CAPACITY: usize = 16;

/// Cloneable publisher/subscription point for lifecycle events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publishes `event` and returns how many subscribers will see it.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!("no subscribers for {event:?}");
                0
            }
        }
    }

    /// Returns a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
