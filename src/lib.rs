//! # servitor
//!
//! **Servitor** is a minimal runtime scaffold that turns an arbitrary
//! user-supplied entry point into a long-lived, signal-aware server process:
//! it can daemonize itself, run a single cooperative main routine, and shut
//! down cleanly on termination signals or on explicit request.
//!
//! ## Architecture
//! ```text
//!      caller                         OS signals
//!        │                                │ (async, any time)
//!        ▼                                ▼
//! ┌───────────────────────────┐   ┌───────────────┐
//! │  Server (lifecycle        │◄──┤ Signal Bridge │  TERM/INT ─► stop (final)
//! │  controller, one per      │   │ (table+chan)  │  HUP      ─► restart
//! │  process tree)            │   └───────────────┘  ABRT/SEGV─► _exit
//! │   ├─ Daemonizer           │
//! │   │   parent ─► re-exec detached child, return
//! │   │   child/foreground ─► run the main routine
//! │   ├─ Lock (non-owned, signaling)
//! │   │   held while the routine is conceptually executing
//! │   └─ main task ─► Service::run(args, token)
//! │                   unlocks + retires itself on return
//! └──────────┬────────────────┘
//!            │ publishes
//!            ▼
//!          Bus ──► SubscriberSet ──► SyslogWriter / LogWriter / custom
//! ```
//!
//! ## Lifecycle
//! - [`Server::start`] schedules the registered [`Service`] and blocks
//!   cooperatively (a bounded wait on the [`Lock`], not a dedicated thread)
//!   until the routine finishes or a stop is requested.
//! - [`Server::stop`] cancels the routine through its token, restores the
//!   idle invariants and - on final shutdown only - runs the `at_exit` hook
//!   exactly once.
//! - [`Server::restart`] stops and re-schedules the same service;
//!   configuration is reloaded, `at_exit` does not run.
//! - The signal bridge turns `SIGTERM`/`SIGINT` into a final stop, `SIGHUP`
//!   into a restart, and `SIGABRT`/`SIGSEGV` into immediate termination.
//!   Signal-triggered requests are best-effort and never propagate errors.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use servitor::{Server, ServerConfig, ServiceFn, Subscribe, SyslogWriter};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = ServerConfig::default();
//!     let subs: Vec<Arc<dyn Subscribe>> =
//!         vec![Arc::new(SyslogWriter::new(&cfg.syslog_ident))];
//!     let server = Server::new(cfg, subs);
//!
//!     server.register(ServiceFn::arc("app", |args: Vec<String>, ctx: CancellationToken| async move {
//!         let _ = args;
//!         // serve until asked to stop
//!         ctx.cancelled().await;
//!     }));
//!     server.at_exit(|| println!("final shutdown"));
//!     server.install_signal_handlers()?;
//!
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod lock;
mod server;
mod service;
mod subscribers;

// ---- Public re-exports ----

pub use config::ServerConfig;
pub use error::ServerError;
pub use events::{Bus, Event, EventKind};
pub use lock::{Lock, WaitOutcome};
pub use server::{DaemonRole, Server, SignalAction};
pub use service::{Service, ServiceFn, ServiceRef};
pub use subscribers::{Severity, Subscribe, SubscriberSet, SyslogWriter};

// Optional: expose the simple built-in stdout writer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
