//! # Demo: daemon
//!
//! A signal-aware server that can detach itself from the terminal.
//!
//! Shows how to:
//! - Let the daemonizer pick the process role from the argument list
//! - Install the signal bridge (`SIGHUP` reloads, `SIGTERM` stops)
//! - Log lifecycle events to stdout and to the system log
//!
//! ## Run
//! ```bash
//! # foreground, stop with Ctrl-C:
//! cargo run --example daemon --features logging
//!
//! # detached; watch syslog, then `kill -HUP`/`kill -TERM` the child:
//! cargo run --example daemon --features logging -- daemonize
//! ```

use std::sync::Arc;
use std::time::Duration;

use servitor::{DaemonRole, LogWriter, Server, ServerConfig, ServiceFn, Subscribe, SyslogWriter};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = ServerConfig::default();
    let subs: Vec<Arc<dyn Subscribe>> = vec![
        Arc::new(SyslogWriter::new(&cfg.syslog_ident)),
        Arc::new(LogWriter::new()),
    ];
    let server = Server::new(cfg, subs);

    server.register(ServiceFn::arc("daemon", |args: Vec<String>, ctx: CancellationToken| async move {
        println!("serving with args {args:?}");
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(5)) => println!("still here"),
            }
        }
    }));
    server.at_exit(|| println!("at_exit: goodbye"));
    server.install_signal_handlers()?;

    match server.role() {
        DaemonRole::Parent => println!("detaching..."),
        DaemonRole::Child => println!("running detached (pid {})", server.pid()),
        DaemonRole::Foreground => println!("running in the foreground (pid {})", server.pid()),
    }

    server.start().await?;
    Ok(())
}
