//! Signal bridge: map delivered OS signals to lifecycle actions.
//!
//! Signal handlers must not run arbitrary logic in the delivery context.
//! Graceful signals are observed through tokio's signal streams, translated
//! with a fixed table and forwarded over a channel to a dispatcher task that
//! calls into the controller. Fault signals never reach the async runtime:
//! they are handled by a raw async-signal-safe handler that terminates the
//! process on the spot.
//!
//! ## Mapping
//! ```text
//! SIGTERM, SIGINT ─► Stop       (exiting = true, graceful, at_exit fires)
//! SIGHUP          ─► Restart    (stop + start, at_exit does not fire)
//! SIGABRT, SIGSEGV─► Terminate  (immediate _exit, no cleanup)
//! ```
//!
//! ## Rules
//! - Every controller call made on behalf of a signal swallows errors: a
//!   duplicate `SIGTERM` while already idle is `NotRunning` and that is fine.
//! - The dispatcher only ever issues lifecycle requests; it never touches
//!   controller state directly.

use std::io;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use crate::events::{Event, EventKind};
use crate::server::controller::Server;

/// Lifecycle action a signal maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Graceful stop; marks the shutdown as final.
    Stop,
    /// Stop followed by a start with the registered service.
    Restart,
    /// Immediate process termination, no cleanup attempted.
    Terminate,
}

/// Static signal→action table. Read-only after initialization.
const SIGNAL_TABLE: &[(libc::c_int, &str, SignalAction)] = &[
    (libc::SIGTERM, "SIGTERM", SignalAction::Stop),
    (libc::SIGINT, "SIGINT", SignalAction::Stop),
    (libc::SIGHUP, "SIGHUP", SignalAction::Restart),
    (libc::SIGABRT, "SIGABRT", SignalAction::Terminate),
    (libc::SIGSEGV, "SIGSEGV", SignalAction::Terminate),
];

/// Returns the lifecycle action for a raw signal number, if mapped.
pub fn action_for(signo: libc::c_int) -> Option<SignalAction> {
    SIGNAL_TABLE
        .iter()
        .find(|(s, _, _)| *s == signo)
        .map(|(_, _, action)| *action)
}

/// Installs the whole bridge: fault handlers, one listener per graceful
/// signal, and the dispatcher task.
pub(crate) fn install(server: Arc<Server>) -> io::Result<()> {
    install_fault_handlers()?;

    let (tx, mut rx) = mpsc::channel::<(&'static str, SignalAction)>(8);
    for (signo, name, action) in SIGNAL_TABLE {
        if *action == SignalAction::Terminate {
            continue;
        }
        spawn_listener(SignalKind::from_raw(*signo), *name, *action, tx.clone())?;
    }

    tokio::spawn(async move {
        while let Some((name, action)) = rx.recv().await {
            apply(&server, action, name).await;
        }
    });
    Ok(())
}

/// Applies one signal-triggered lifecycle request, swallowing every error.
pub(crate) async fn apply(server: &Arc<Server>, action: SignalAction, name: &'static str) {
    server
        .bus()
        .publish(Event::now(EventKind::SignalReceived).with_signal(name));
    match action {
        SignalAction::Stop => {
            server
                .bus()
                .publish(Event::now(EventKind::ShutdownRequested).with_signal(name));
            server.mark_exiting();
            let _ = server.stop().await;
        }
        SignalAction::Restart => {
            let _ = server.restart().await;
        }
        // Normally handled by the raw fault handler before it could be
        // enqueued; honor the contract anyway.
        SignalAction::Terminate => std::process::abort(),
    }
}

/// Forwards one tokio signal stream into the dispatcher channel.
fn spawn_listener(
    kind: SignalKind,
    name: &'static str,
    action: SignalAction,
    tx: mpsc::Sender<(&'static str, SignalAction)>,
) -> io::Result<()> {
    let mut stream = signal(kind)?;
    tokio::spawn(async move {
        while stream.recv().await.is_some() {
            if tx.send((name, action)).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

/// Raw handler for fault signals. Only async-signal-safe calls allowed here.
extern "C" fn terminate_now(signo: libc::c_int) {
    unsafe { libc::_exit(128 + signo) }
}

/// Installs [`terminate_now`] for `SIGABRT` and `SIGSEGV`.
///
/// Process state may be corrupted when these arrive, so no graceful shutdown
/// is attempted: the handler exits without unwinding or cleanup.
fn install_fault_handlers() -> io::Result<()> {
    for (signo, _, action) in SIGNAL_TABLE {
        if *action != SignalAction::Terminate {
            continue;
        }
        let handler = terminate_now as extern "C" fn(libc::c_int);
        let mut act: libc::sigaction = unsafe { std::mem::zeroed() };
        act.sa_sigaction = handler as libc::sighandler_t;
        unsafe {
            libc::sigemptyset(&mut act.sa_mask);
        }
        if unsafe { libc::sigaction(*signo, &act, std::ptr::null_mut()) } != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_signals_map_to_stop() {
        assert_eq!(action_for(libc::SIGTERM), Some(SignalAction::Stop));
        assert_eq!(action_for(libc::SIGINT), Some(SignalAction::Stop));
    }

    #[test]
    fn test_hangup_maps_to_restart() {
        assert_eq!(action_for(libc::SIGHUP), Some(SignalAction::Restart));
    }

    #[test]
    fn test_fault_signals_map_to_terminate() {
        assert_eq!(action_for(libc::SIGABRT), Some(SignalAction::Terminate));
        assert_eq!(action_for(libc::SIGSEGV), Some(SignalAction::Terminate));
    }

    #[test]
    fn test_unmapped_signals_have_no_action() {
        assert_eq!(action_for(libc::SIGUSR1), None);
        assert_eq!(action_for(libc::SIGPIPE), None);
    }
}
