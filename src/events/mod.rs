//! Runtime events and the bus that carries them.
//!
//! Observability in this crate is event-driven: the controller, the signal
//! bridge and the daemonizer publish [`Event`]s to a shared [`Bus`], and
//! subscribers (log writers, syslog, user code) consume them off the bus.
//!
//! ```text
//! Publishers:                          Consumer:
//!   controller  ──┐
//!   signal bridge ┼──► Bus ──► listener ──► SubscriberSet ──► writers
//!   daemonizer  ──┘   (broadcast)
//! ```

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
