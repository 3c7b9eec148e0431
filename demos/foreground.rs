//! # Demo: foreground
//!
//! Runs a ticker service in the foreground and stops it programmatically.
//!
//! Shows how to:
//! - Register a function-backed [`ServiceFn`] as the main routine
//! - Block in [`Server::start`] while the routine runs
//! - Interrupt that wait with [`Server::stop`] from another task
//!
//! ## Run
//! ```bash
//! cargo run --example foreground
//! ```

use std::sync::Arc;
use std::time::Duration;

use servitor::{Server, ServerConfig, ServiceFn};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), servitor::ServerError> {
    let server = Server::new(ServerConfig::default(), Vec::new());

    server.register(ServiceFn::arc("ticker", |_args: Vec<String>, ctx: CancellationToken| async move {
        let mut n = 0u32;
        while !ctx.is_cancelled() {
            println!("tick {n}");
            n += 1;
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(500)) => {}
            }
        }
        println!("ticker winding down");
    }));
    server.at_exit(|| println!("at_exit: final shutdown"));

    // Ask for a final stop after three seconds, from another point of control.
    let stopper = Arc::clone(&server);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        let _ = stopper.shutdown().await;
    });

    println!("serving (pid {})", server.pid());
    server.start().await?;
    println!("idle again");
    Ok(())
}
