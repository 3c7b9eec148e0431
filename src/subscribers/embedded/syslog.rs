//! SyslogWriter — system log appender.
//!
//! Translates lifecycle events into `syslog(3)` records. The connection is
//! opened once per writer (`openlog` with `LOG_CONS | LOG_NDELAY | LOG_PID`
//! under the `LOG_USER` facility) and closed when the writer is dropped.
//!
//! ## Level mapping
//! | [`Severity`]      | syslog priority |
//! |-------------------|-----------------|
//! | `Trace`, `Debug`  | `LOG_DEBUG`     |
//! | `Info`            | `LOG_INFO`      |
//! | `Warning`         | `LOG_WARNING`   |
//! | `Error`           | `LOG_ERR`       |
//! | `Fatal`           | `LOG_EMERG`     |

use std::ffi::CString;

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Returns the `syslog(3)` priority for this severity.
    pub fn priority(self) -> libc::c_int {
        match self {
            Severity::Trace | Severity::Debug => libc::LOG_DEBUG,
            Severity::Info => libc::LOG_INFO,
            Severity::Warning => libc::LOG_WARNING,
            Severity::Error => libc::LOG_ERR,
            Severity::Fatal => libc::LOG_EMERG,
        }
    }
}

/// Log appender for syslog integration.
///
/// `openlog` keeps a pointer to the identity string, so the writer owns the
/// `CString` for its whole lifetime.
pub struct SyslogWriter {
    #[allow(dead_code)]
    ident: CString,
}

impl SyslogWriter {
    /// Opens a syslog connection under the given identity.
    ///
    /// Interior NUL bytes in `ident` are stripped.
    pub fn new(ident: &str) -> Self {
        let ident = CString::new(ident.replace('\0', ""))
            .unwrap_or_else(|_| c"servitor".to_owned());
        unsafe {
            libc::openlog(
                ident.as_ptr(),
                libc::LOG_CONS | libc::LOG_NDELAY | libc::LOG_PID,
                libc::LOG_USER,
            );
        }
        Self { ident }
    }

    fn severity_for(kind: EventKind) -> Severity {
        match kind {
            EventKind::ServerStarting
            | EventKind::ServerStopped
            | EventKind::SignalReceived
            | EventKind::ChildSpawned
            | EventKind::AtExitInvoked => Severity::Info,
            EventKind::RestartRequested | EventKind::ShutdownRequested => Severity::Warning,
        }
    }

    fn render(e: &Event) -> String {
        let mut record = String::new();
        record.push_str(match e.kind {
            EventKind::ServerStarting => "starting",
            EventKind::ServerStopped => "stopped",
            EventKind::RestartRequested => "restart requested",
            EventKind::ShutdownRequested => "shutdown requested",
            EventKind::SignalReceived => "signal received",
            EventKind::ChildSpawned => "detached child spawned",
            EventKind::AtExitInvoked => "at-exit hook invoked",
        });
        if let Some(signal) = e.signal {
            record.push_str(&format!(" signal={signal}"));
        }
        if let Some(pid) = e.pid {
            record.push_str(&format!(" pid={pid}"));
        }
        if let Some(reason) = e.reason.as_deref() {
            record.push_str(&format!(" detail={reason}"));
        }
        record
    }

    /// Forwards one formatted record at the given severity.
    pub fn write(&self, severity: Severity, record: &str) {
        if let Ok(message) = CString::new(record) {
            unsafe {
                libc::syslog(severity.priority(), c"%s".as_ptr(), message.as_ptr());
            }
        }
    }
}

impl Drop for SyslogWriter {
    fn drop(&mut self) {
        unsafe { libc::closelog() }
    }
}

#[async_trait]
impl Subscribe for SyslogWriter {
    async fn on_event(&self, e: &Event) {
        self.write(Self::severity_for(e.kind), &Self::render(e));
    }

    fn name(&self) -> &'static str {
        "SyslogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_priorities() {
        assert_eq!(Severity::Trace.priority(), libc::LOG_DEBUG);
        assert_eq!(Severity::Debug.priority(), libc::LOG_DEBUG);
        assert_eq!(Severity::Info.priority(), libc::LOG_INFO);
        assert_eq!(Severity::Warning.priority(), libc::LOG_WARNING);
        assert_eq!(Severity::Error.priority(), libc::LOG_ERR);
        assert_eq!(Severity::Fatal.priority(), libc::LOG_EMERG);
    }

    #[test]
    fn test_render_includes_metadata() {
        let record = SyslogWriter::render(
            &Event::now(EventKind::ShutdownRequested)
                .with_signal("SIGTERM")
                .with_pid(7),
        );
        assert_eq!(record, "shutdown requested signal=SIGTERM pid=7");
    }
}
