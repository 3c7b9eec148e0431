//! SubscriberSet: non-blocking fan-out over multiple subscribers.
//!
//! [`SubscriberSet`] distributes each [`Event`] to every subscriber without
//! awaiting their processing.
//!
//! ## Rules
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order); no global ordering across subscribers.
//! - Panics inside a subscriber are caught and reported, never propagated.
//! - On queue overflow, events are dropped for that subscriber only.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Event;

use super::Subscribe;

/// Per-subscriber channel with metadata.
struct Channel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
///
/// Must be created inside a tokio runtime: one worker task is spawned per
/// subscriber.
pub struct SubscriberSet {
    channels: Vec<Channel>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        eprintln!("[servitor] subscriber '{}' panicked: {:?}", sub.name(), panic);
                    }
                }
            });

            channels.push(Channel { name, sender: tx });
            workers.push(handle);
        }

        Self { channels, workers }
    }

    /// Fans one event out to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is full or its worker is gone, the event is
    /// dropped for that subscriber and a warning names it.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    eprintln!("[servitor] subscriber '{}' dropped event: queue full", channel.name);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    eprintln!("[servitor] subscriber '{}' dropped event: worker closed", channel.name);
                }
            }
        }
    }

    /// Graceful shutdown: closes all queues and awaits worker completion.
    pub async fn shutdown(self) {
        drop(self.channels);
        for worker in self.workers {
            let _ = worker.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber() {
        let seen_a = Arc::new(AtomicUsize::new(0));
        let seen_b = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(vec![
            Arc::new(Counter(Arc::clone(&seen_a))),
            Arc::new(Counter(Arc::clone(&seen_b))),
        ]);

        set.emit(&Event::now(EventKind::ServerStarting));
        set.emit(&Event::now(EventKind::ServerStopped));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen_a.load(Ordering::SeqCst), 2);
        assert_eq!(seen_b.load(Ordering::SeqCst), 2);
        assert_eq!(set.len(), 2);

        set.shutdown().await;
    }
}
