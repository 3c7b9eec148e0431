//! Event subscribers for the server runtime.
//!
//! Subscribers observe lifecycle events broadcast through the
//! [`Bus`](crate::events::Bus):
//!
//! ```text
//! controller ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                  ┌─────────┼─────────┐
//!                                                  ▼         ▼         ▼
//!                                             SyslogWriter LogWriter custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```
//! use async_trait::async_trait;
//! use servitor::{Event, EventKind, Subscribe};
//!
//! struct Alerts;
//!
//! #[async_trait]
//! impl Subscribe for Alerts {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ShutdownRequested {
//!             // page someone...
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "alerts"
//!     }
//! }
//! ```

mod embedded;
mod set;
mod subscribe;

pub use embedded::{Severity, SyslogWriter};
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
