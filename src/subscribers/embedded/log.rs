//! LogWriter — simple event printer.
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [starting] pid=4242 service="worker"
//! [signal] signal="SIGHUP"
//! [restart-requested] pid=4242
//! [shutdown-requested] signal="SIGTERM"
//! [stopped] pid=4242
//! [at-exit] pid=4242
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event printer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ServerStarting => {
                println!(
                    "[starting] pid={:?} service={:?}",
                    e.pid,
                    e.reason.as_deref().unwrap_or("?")
                );
            }
            EventKind::ServerStopped => {
                println!("[stopped] pid={:?}", e.pid);
            }
            EventKind::RestartRequested => {
                println!("[restart-requested] pid={:?}", e.pid);
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested] signal={:?}", e.signal);
            }
            EventKind::SignalReceived => {
                println!("[signal] signal={:?}", e.signal);
            }
            EventKind::ChildSpawned => {
                println!("[child-spawned] pid={:?}", e.pid);
            }
            EventKind::AtExitInvoked => {
                println!("[at-exit] pid={:?}", e.pid);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
