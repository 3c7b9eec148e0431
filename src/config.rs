//! Global runtime configuration.
//!
//! [`ServerConfig`] defines the controller's timing, the event bus capacity,
//! the reserved process-argument markers used by the daemonizer, and the
//! syslog identity.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use servitor::ServerConfig;
//!
//! let mut cfg = ServerConfig::default();
//! cfg.wait_interval = Duration::from_millis(500);
//! cfg.bus_capacity = 64;
//!
//! assert_eq!(cfg.child_marker, "child");
//! ```

use std::time::Duration;

/// Configuration for the server runtime.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Deadline for each pass of the controller's wait loop.
    ///
    /// A shorter interval makes `stop()` interrupt a blocked `start()` sooner
    /// at the cost of more wakeups.
    pub wait_interval: Duration,
    /// Deadline for publishing the release token on unlock.
    ///
    /// An unlock with no waiter is allowed to time out silently.
    pub release_timeout: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Reserved argument marking the re-exec'd child process.
    pub child_marker: String,
    /// Reserved argument requesting daemonization.
    pub daemonize_flag: String,
    /// Identity string reported to the system log.
    pub syslog_ident: String,
}

impl Default for ServerConfig {
    /// Provides a default configuration:
    /// - `wait_interval = 1s`
    /// - `release_timeout = 1s`
    /// - `bus_capacity = 256`
    /// - `child_marker = "child"`
    /// - `daemonize_flag = "daemonize"`
    /// - `syslog_ident = "servitor"`
    fn default() -> Self {
        Self {
            wait_interval: Duration::from_secs(1),
            release_timeout: Duration::from_secs(1),
            bus_capacity: 256,
            child_marker: "child".to_string(),
            daemonize_flag: "daemonize".to_string(),
            syslog_ident: "servitor".to_string(),
        }
    }
}
