//! Built-in subscribers.
//!
//! - [`SyslogWriter`]: forwards events to the OS system log.
//! - [`LogWriter`] (feature `logging`): prints events to stdout (demo/debug).

#[cfg(feature = "logging")]
mod log;
mod syslog;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use syslog::{Severity, SyslogWriter};
