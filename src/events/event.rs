//! Lifecycle events emitted by the server runtime.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the metadata
//! (timestamp, sequence number, pid, signal name, free-form reason).
//!
//! ## Ordering
//! Each event gets a globally unique sequence number (`seq`) that increases
//! monotonically. Use it to restore order when events are rendered from
//! different subscribers.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The main routine was scheduled.
    ///
    /// Sets: `pid`, `reason` (service name).
    ServerStarting,

    /// The main routine finished or was stopped; the server is idle.
    ///
    /// Sets: `pid`.
    ServerStopped,

    /// A restart was requested (`SIGHUP` or an explicit `restart()`).
    ///
    /// Sets: `pid`.
    RestartRequested,

    /// A graceful shutdown was requested (`SIGTERM`/`SIGINT`).
    ///
    /// Sets: `signal`.
    ShutdownRequested,

    /// A mapped OS signal was delivered.
    ///
    /// Sets: `signal`.
    SignalReceived,

    /// The transient parent re-executed itself as a detached child.
    ///
    /// Sets: `pid` (the child's).
    ChildSpawned,

    /// The `at_exit` hook ran. Published at most once per process.
    ///
    /// Sets: `pid`.
    AtExitInvoked,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Process id, where applicable.
    pub pid: Option<u32>,
    /// Name of the delivered signal, where applicable.
    pub signal: Option<&'static str>,
    /// Human-readable detail (service name, error label, ...).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates an event of the given kind stamped with the current time and
    /// the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pid: None,
            signal: None,
            reason: None,
        }
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a signal name.
    #[inline]
    pub fn with_signal(mut self, signal: &'static str) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::now(EventKind::ServerStarting);
        let b = Event::now(EventKind::ServerStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::now(EventKind::ShutdownRequested)
            .with_signal("SIGTERM")
            .with_pid(42)
            .with_reason("graceful");
        assert_eq!(ev.kind, EventKind::ShutdownRequested);
        assert_eq!(ev.signal, Some("SIGTERM"));
        assert_eq!(ev.pid, Some(42));
        assert_eq!(ev.reason.as_deref(), Some("graceful"));
    }
}
