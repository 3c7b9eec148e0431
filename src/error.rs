//! Errors returned by the server lifecycle controller.
//!
//! All lifecycle misuse (double start, stop while idle, start without a
//! registered service) is surfaced synchronously to the caller of
//! [`Server::start`](crate::Server::start) / [`Server::stop`](crate::Server::stop).
//! Signal-triggered invocations of those same operations swallow these errors:
//! a duplicate `SIGTERM` must not crash the signal path.
//!
//! The [`Lock`](crate::Lock) primitive is deliberately absent from this
//! taxonomy: all of its failure modes degrade to boolean or tri-state results.

use std::io;
use thiserror::Error;

/// Errors produced by the lifecycle controller.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServerError {
    /// `start` was called while a main task (or a detached child) is active.
    #[error("server is already running")]
    AlreadyRunning,

    /// `stop` was called while no main task is active.
    #[error("server is not running")]
    NotRunning,

    /// `start` was called and no service was ever registered.
    #[error("no main routine registered")]
    NoMainRoutine,

    /// The scheduler could not create the main-routine task.
    ///
    /// Fatal to that `start` call.
    #[error("cannot schedule main routine: {reason}")]
    CannotSchedule {
        /// Why the scheduler refused.
        reason: String,
    },

    /// Re-executing the binary as a detached child failed.
    #[error("failed to launch detached child: {source}")]
    Daemonize {
        /// The underlying spawn error.
        #[source]
        source: io::Error,
    },
}

impl ServerError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servitor::ServerError;
    ///
    /// assert_eq!(ServerError::AlreadyRunning.as_label(), "already_running");
    /// assert_eq!(ServerError::NotRunning.as_label(), "not_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServerError::AlreadyRunning => "already_running",
            ServerError::NotRunning => "not_running",
            ServerError::NoMainRoutine => "no_main_routine",
            ServerError::CannotSchedule { .. } => "cannot_schedule",
            ServerError::Daemonize { .. } => "daemonize_failed",
        }
    }
}
