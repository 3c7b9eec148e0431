//! Daemonizer: decide once per start whether to re-exec detached.
//!
//! Argument convention: a reserved marker argument (`child` by default) says
//! "this process is the re-exec'd child"; a second reserved argument
//! (`daemonize`) requests detaching. The decision rule is recursion-safe: a
//! re-exec always carries the child marker, so a child run under this rule
//! never forks again.
//!
//! ```text
//! argv contains "child"      ─► Child       (run the main routine directly)
//! argv contains "daemonize"  ─► Parent      (re-exec detached, then return)
//! neither                    ─► Foreground  (run directly, attached)
//! ```

use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use crate::config::ServerConfig;

/// Role of the current process for one `start` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonRole {
    /// This process is the re-exec'd child; run the main routine.
    Child,
    /// This process must re-exec itself detached and take no further action.
    Parent,
    /// No daemonization requested; run the main routine attached.
    Foreground,
}

/// Decision procedure consulted once per `start`.
#[derive(Debug, Clone)]
pub(crate) struct Daemonizer {
    child_marker: String,
    daemonize_flag: String,
}

impl Daemonizer {
    pub(crate) fn new(cfg: &ServerConfig) -> Self {
        Self {
            child_marker: cfg.child_marker.clone(),
            daemonize_flag: cfg.daemonize_flag.clone(),
        }
    }

    /// Decides the role from the process argument list (`argv[0]` included).
    pub(crate) fn role(&self, args: &[String]) -> DaemonRole {
        let rest = args.iter().skip(1);
        if rest.clone().any(|a| *a == self.child_marker) {
            DaemonRole::Child
        } else if rest.clone().any(|a| *a == self.daemonize_flag) {
            DaemonRole::Parent
        } else {
            DaemonRole::Foreground
        }
    }

    /// Rewrites the argument list for the child: drops `argv[0]`, strips the
    /// daemonize flag and prepends the child marker.
    pub(crate) fn child_args(&self, args: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(args.len());
        out.push(self.child_marker.clone());
        out.extend(
            args.iter()
                .skip(1)
                .filter(|a| **a != self.daemonize_flag)
                .cloned(),
        );
        out
    }

    /// Re-executes the current binary as a detached child.
    ///
    /// The child gets its own process group and null stdio, so it survives
    /// the invoking terminal. Returns the child's pid.
    pub(crate) fn spawn_detached(&self, args: &[String]) -> io::Result<u32> {
        let exe = std::env::current_exe()?;
        let child = Command::new(exe)
            .args(self.child_args(args))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()?;
        Ok(child.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daemonizer() -> Daemonizer {
        Daemonizer::new(&ServerConfig::default())
    }

    fn argv(rest: &[&str]) -> Vec<String> {
        std::iter::once("/usr/bin/server")
            .chain(rest.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_role_child_marker_wins() {
        let d = daemonizer();
        assert_eq!(d.role(&argv(&["child", "daemonize"])), DaemonRole::Child);
        assert_eq!(d.role(&argv(&["child"])), DaemonRole::Child);
    }

    #[test]
    fn test_role_daemonize_means_parent() {
        let d = daemonizer();
        assert_eq!(d.role(&argv(&["daemonize"])), DaemonRole::Parent);
        assert_eq!(d.role(&argv(&["--port", "8080", "daemonize"])), DaemonRole::Parent);
    }

    #[test]
    fn test_role_plain_run_is_foreground() {
        let d = daemonizer();
        assert_eq!(d.role(&argv(&[])), DaemonRole::Foreground);
        assert_eq!(d.role(&argv(&["--port", "8080"])), DaemonRole::Foreground);
    }

    #[test]
    fn test_argv0_never_decides_the_role() {
        let d = daemonizer();
        let args = vec!["daemonize".to_string(), "--port".to_string()];
        assert_eq!(d.role(&args), DaemonRole::Foreground);
    }

    #[test]
    fn test_child_args_rewrite() {
        let d = daemonizer();
        let rewritten = d.child_args(&argv(&["--port", "8080", "daemonize"]));
        assert_eq!(rewritten, vec!["child", "--port", "8080"]);
    }
}
