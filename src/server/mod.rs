//! Runtime core: the lifecycle state machine and its collaborators.
//!
//! Internal modules:
//! - [`controller`]: the [`Server`] state machine (start/stop/restart, the
//!   bounded wait loop, the `at_exit` hook);
//! - [`daemon`]: the parent/child role decision and detached re-exec;
//! - [`signal`]: the signal→action table and the dispatcher that turns OS
//!   signals into lifecycle requests.

mod controller;
mod daemon;
mod signal;

pub use controller::Server;
pub use daemon::DaemonRole;
pub use signal::SignalAction;
