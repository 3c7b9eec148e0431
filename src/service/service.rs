//! Service trait: the contract between the runtime and user code.
//!
//! A service receives the process arguments and a [`CancellationToken`] and
//! should periodically check the token to stop cooperatively when the
//! controller or a termination signal requests it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// The entry point of your server.
///
/// The runtime calls into this trait at fixed points: configuration is
/// (re)loaded during bootstrap and on every restart, then [`run`](Service::run)
/// executes as the single cooperatively-scheduled main routine. The routine
/// signals termination by returning; it is never force-killed, only asked to
/// stop through its token.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use servitor::Service;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Service for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn run(&self, _args: Vec<String>, ctx: CancellationToken) {
///         while !ctx.is_cancelled() {
///             // accept and serve one request...
///             tokio::task::yield_now().await;
///             # break;
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable service name.
    fn name(&self) -> &str;

    /// Loads configuration. Called during bootstrap and again on every
    /// restart, before the main routine is scheduled.
    fn load_configuration(&self) {}

    /// The main execution routine.
    ///
    /// Implementations should check `ctx.is_cancelled()` at their own
    /// suspension points and exit promptly during shutdown.
    async fn run(&self, args: Vec<String>, ctx: CancellationToken);
}
