//! Network readiness signal backed by a `tokio::sync::watch` channel.
//!
//! Whoever manages the network interface calls [`NetworkSignal::set_ready`]
//! once an address is acquired and [`NetworkSignal::set_lost`] when it goes
//! away.  The Telnet server waits on it before every listen cycle.
//!
//! # Why `watch`? (for beginners)
//!
//! A `watch` channel stores exactly one value (here: "is the network up?")
//! and lets any number of receivers wait for it to change.  Unlike an `mpsc`
//! channel nothing queues up: a waiter that arrives late simply sees the
//! latest value, which is exactly the semantics of a level-triggered flag.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::application::ports::NetworkReadiness;

/// Cloneable handle to the shared readiness flag.
#[derive(Debug, Clone)]
pub struct NetworkSignal {
    state: Arc<watch::Sender<bool>>,
}

impl NetworkSignal {
    /// Creates a signal in the "not ready" state.
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Marks the network as ready and wakes every waiter.
    pub fn set_ready(&self) {
        self.state.send_replace(true);
    }

    /// Marks the network as gone.
    pub fn set_lost(&self) {
        self.state.send_replace(false);
    }
}

impl Default for NetworkSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkReadiness for NetworkSignal {
    async fn wait_ready(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn is_ready(&self) -> bool {
        *self.state.borrow()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_new_signal_is_not_ready() {
        assert!(!NetworkSignal::new().is_ready());
    }

    #[test]
    fn test_set_ready_then_lost() {
        let signal = NetworkSignal::new();
        signal.set_ready();
        assert!(signal.is_ready());
        signal.set_lost();
        assert!(!signal.is_ready());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = NetworkSignal::new();
        let clone = signal.clone();
        clone.set_ready();
        assert!(signal.is_ready());
    }

    #[tokio::test]
    async fn test_wait_ready_returns_immediately_when_ready() {
        let signal = NetworkSignal::new();
        signal.set_ready();
        tokio_test::assert_ok!(timeout(Duration::from_millis(100), signal.wait_ready()).await);
    }

    #[tokio::test]
    async fn test_wait_ready_blocks_until_set() {
        // Arrange
        let signal = NetworkSignal::new();
        let waiter = signal.clone();
        let task = tokio::spawn(async move { waiter.wait_ready().await });

        // Not ready yet: the waiter must still be pending.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        // Act
        signal.set_ready();

        // Assert
        tokio_test::assert_ok!(timeout(Duration::from_secs(1), task).await);
    }

    #[tokio::test]
    async fn test_wait_ready_times_out_while_lost() {
        let signal = NetworkSignal::new();
        tokio_test::assert_err!(timeout(Duration::from_millis(50), signal.wait_ready()).await);
    }
}
