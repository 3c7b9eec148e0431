//! Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]: non-blocking
//! publish from any component, bounded ring buffer, no persistence. Slow
//! receivers observe `RecvError::Lagged(n)` and skip the `n` oldest events.
//!
//! The runtime uses a single receiver (the [`Server`](crate::Server)'s
//! listener) that fans events out to subscribers.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events.
///
/// Cheap to clone (the sender is `Arc`-backed internally). Publishing with no
/// active receivers drops the event; that is fine for fire-and-forget
/// observability.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to >= 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers. Never blocks.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
