//! # Server: the process-wide lifecycle controller.
//!
//! The single state machine governing whether the user's main routine is
//! executing, and the sole owner of the decision to start, stop or restart
//! it. One logical server instance per OS process tree.
//!
//! ## Lifecycle
//! ```text
//! start()
//!   ├─► role = Daemonizer.role(argv)
//!   │     ├─ Parent ──► spawn detached child, return    (never enters Running)
//!   │     └─ Child / Foreground:
//!   │          ├─► service.load_configuration()
//!   │          ├─► lock.try_lock()                      (on behalf of the routine)
//!   │          ├─► spawn main task ──► service.run(args, token)
//!   │          │                        └─► unlock + clear own slot on return
//!   │          └─► wait loop:
//!   │                loop {
//!   │                  lock.wait(~1s)
//!   │                  if no active task ─► break       (stopped or finished)
//!   │                  yield
//!   │                }
//!   │                if exiting ─► fire at_exit (once)
//!   │
//! stop()      cancel token ─► clear slot ─► at_exit if exiting ─► force-unlock
//! restart()   stop (exiting untouched) ─► schedule again, without blocking
//! ```
//!
//! ## Rules
//! - At most one main task is active at any time: the handle slot is checked
//!   and set without an intervening suspension point.
//! - The Lock's flag is the single source of truth for "the routine is still
//!   conceptually executing"; the wait loop is the only consumer of its
//!   release token.
//! - Cancellation is cooperative. `stop()` never force-kills the task stack;
//!   it forces the Lock back to unlocked so `Idle` implies `unlocked` even if
//!   the task takes extra time to unwind.
//! - The `at_exit` hook runs exactly once per process, at final shutdown
//!   only - never across a restart.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::events::{Bus, Event, EventKind};
use crate::lock::{Lock, WaitOutcome};
use crate::server::daemon::{DaemonRole, Daemonizer};
use crate::server::signal;
use crate::service::ServiceRef;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Hook invoked exactly once at final shutdown.
type AtExitHook = Box<dyn FnOnce() + Send + 'static>;

/// A scheduled main-routine task.
struct ActiveTask {
    /// Identifies this task generation; a stale task never clears a
    /// successor's slot.
    id: u64,
    token: CancellationToken,
    #[allow(dead_code)]
    join: JoinHandle<()>,
}

/// What `launch` scheduled.
enum Launched {
    /// A detached child process; this process takes no further action.
    Detached,
    /// The main routine, as a cooperative task.
    Main,
}

/// What `stop` retired.
enum Retired {
    Task,
    Child(u32),
}

struct Inner {
    service: Option<ServiceRef>,
    active: Option<ActiveTask>,
    child: Option<u32>,
    at_exit: Option<AtExitHook>,
}

/// Process-wide lifecycle controller.
///
/// Create one per process, early, and hand the `Arc` to every collaborator
/// that needs it. Must be created inside a tokio runtime: the constructor
/// spawns the subscriber workers and the bus listener.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use servitor::{Server, ServerConfig, ServiceFn, Subscribe, SyslogWriter};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cfg = ServerConfig::default();
///     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(SyslogWriter::new(&cfg.syslog_ident))];
///     let server = Server::new(cfg, subs);
///
///     server.register(ServiceFn::arc("app", |_args: Vec<String>, ctx: CancellationToken| async move {
///         ctx.cancelled().await;
///     }));
///     server.at_exit(|| println!("bye"));
///     server.install_signal_handlers()?;
///
///     // Blocks until the routine finishes or a stop is requested.
///     server.start().await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    cfg: ServerConfig,
    bus: Bus,
    lock: Lock,
    daemonizer: Daemonizer,
    inner: Mutex<Inner>,
    exiting: AtomicBool,
    task_seq: AtomicU64,
    args: Vec<String>,
    pid: u32,
    ppid: u32,
    /// Handle to the `Arc` this controller lives in; lets `&self` methods
    /// hand a strong reference to the tasks they spawn.
    me: Weak<Server>,
}

impl Server {
    /// Creates the controller with the process's own argument list.
    pub fn new(cfg: ServerConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Arc<Self> {
        Self::with_args(cfg, subscribers, std::env::args().collect())
    }

    /// Creates the controller with an explicit argument list.
    ///
    /// `args` follows the OS convention: `args[0]` is the executable path and
    /// is never treated as a control marker.
    pub fn with_args(
        cfg: ServerConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
        args: Vec<String>,
    ) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity);
        let subs = Arc::new(SubscriberSet::new(subscribers));
        Self::spawn_bus_listener(&bus, subs);

        let daemonizer = Daemonizer::new(&cfg);
        let lock = Lock::new(cfg.release_timeout);
        Arc::new_cyclic(|me| Self {
            cfg,
            bus,
            lock,
            daemonizer,
            inner: Mutex::new(Inner {
                service: None,
                active: None,
                child: None,
                at_exit: None,
            }),
            exiting: AtomicBool::new(false),
            task_seq: AtomicU64::new(0),
            args,
            pid: std::process::id(),
            ppid: unsafe { libc::getppid() } as u32,
            me: me.clone(),
        })
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn spawn_bus_listener(bus: &Bus, subs: Arc<SubscriberSet>) {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// The event bus shared with all collaborators.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Pid of this process.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Pid of the parent process.
    pub fn ppid(&self) -> u32 {
        self.ppid
    }

    /// Daemonization role this process would assume on `start`.
    pub fn role(&self) -> DaemonRole {
        self.daemonizer.role(&self.args)
    }

    /// True while a main task (or a detached child) is active.
    pub fn is_running(&self) -> bool {
        let inner = self.inner();
        inner.active.is_some() || inner.child.is_some()
    }

    /// True once a final shutdown has been requested.
    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }

    /// Marks the next stop as a final shutdown: `at_exit` will fire.
    pub(crate) fn mark_exiting(&self) {
        self.exiting.store(true, Ordering::Release);
    }

    /// Registers the service used by `start` and `restart`.
    pub fn register(&self, service: ServiceRef) {
        self.inner().service = Some(service);
    }

    /// Registers the hook invoked exactly once at final shutdown.
    ///
    /// Replaces any previously registered hook.
    pub fn at_exit(&self, hook: impl FnOnce() + Send + 'static) {
        self.inner().at_exit = Some(Box::new(hook));
    }

    /// Installs the signal bridge for this controller.
    ///
    /// Termination signals request a graceful stop, `SIGHUP` a restart, and
    /// fault signals terminate immediately. All signal-triggered lifecycle
    /// calls are best-effort; their errors are swallowed.
    pub fn install_signal_handlers(&self) -> io::Result<()> {
        signal::install(self.strong())
    }

    /// Starts the server.
    ///
    /// In the transient parent this spawns the detached child and returns
    /// immediately. Otherwise it schedules the registered service and blocks
    /// cooperatively until the routine finishes or a [`stop`](Server::stop)
    /// is requested from another point of control.
    ///
    /// # Errors
    /// - [`ServerError::AlreadyRunning`] if a main task is already active,
    ///   regardless of daemonization role.
    /// - [`ServerError::NoMainRoutine`] if no service was registered.
    /// - [`ServerError::CannotSchedule`] if the scheduler refused the task.
    /// - [`ServerError::Daemonize`] if the detached re-exec failed.
    pub async fn start(&self) -> Result<(), ServerError> {
        match self.launch()? {
            Launched::Detached => Ok(()),
            Launched::Main => {
                self.wait_until_idle().await;
                Ok(())
            }
        }
    }

    /// Stops the server.
    ///
    /// Cooperatively cancels the scheduled main task, clears the handle,
    /// invokes `at_exit` iff a final shutdown was requested, and forces the
    /// Lock back to unlocked so `Idle` implies `unlocked` even when the task
    /// has not reached its own unlock yet. In the parent, forwards a
    /// `SIGTERM` to the detached child instead.
    ///
    /// # Errors
    /// [`ServerError::NotRunning`] if there is nothing to stop.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let retired = {
            let mut inner = self.inner();
            if let Some(active) = inner.active.take() {
                active.token.cancel();
                Retired::Task
            } else if let Some(pid) = inner.child.take() {
                Retired::Child(pid)
            } else {
                return Err(ServerError::NotRunning);
            }
        };

        match retired {
            Retired::Task => {
                if self.is_exiting() {
                    self.fire_at_exit();
                }
                if self.lock.is_locked() {
                    self.lock.unlock().await;
                }
                self.bus
                    .publish(Event::now(EventKind::ServerStopped).with_pid(self.pid));
            }
            Retired::Child(pid) => {
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
                if self.is_exiting() {
                    self.fire_at_exit();
                }
                self.bus
                    .publish(Event::now(EventKind::ServerStopped).with_pid(pid));
            }
        }
        Ok(())
    }

    /// Requests a graceful final stop: the programmatic equivalent of a
    /// termination signal.
    ///
    /// Marks the shutdown as final (so `at_exit` fires) and stops the
    /// routine.
    ///
    /// # Errors
    /// [`ServerError::NotRunning`] if there is nothing to stop.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        self.mark_exiting();
        self.stop().await
    }

    /// Stops and immediately re-schedules the registered service.
    ///
    /// The `exiting` flag is left untouched, so `at_exit` is not invoked
    /// across a restart. Does not block waiting for the new routine: the
    /// original `start` caller keeps supervising it.
    pub async fn restart(&self) -> Result<(), ServerError> {
        self.bus
            .publish(Event::now(EventKind::RestartRequested).with_pid(self.pid));
        self.stop().await?;
        self.launch()?;
        Ok(())
    }

    /// Role-aware scheduling shared by `start` and `restart`.
    fn launch(&self) -> Result<Launched, ServerError> {
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }
        let service = self
            .inner()
            .service
            .clone()
            .ok_or(ServerError::NoMainRoutine)?;

        match self.role() {
            DaemonRole::Parent => {
                let pid = self
                    .daemonizer
                    .spawn_detached(&self.args)
                    .map_err(|source| ServerError::Daemonize { source })?;
                self.inner().child = Some(pid);
                self.bus
                    .publish(Event::now(EventKind::ChildSpawned).with_pid(pid));
                Ok(Launched::Detached)
            }
            DaemonRole::Child | DaemonRole::Foreground => {
                self.spawn_main(service)?;
                Ok(Launched::Main)
            }
        }
    }

    /// Schedules the main routine as a cooperative task.
    ///
    /// The handle slot is checked and set under the same guard, with no
    /// suspension point in between: at most one main task can ever be active.
    /// The Lock is acquired here, on behalf of the routine, so the wait loop
    /// can never observe an unlocked Lock before the task had a chance to
    /// run; the task only releases it.
    fn spawn_main(&self, service: ServiceRef) -> Result<(), ServerError> {
        tokio::runtime::Handle::try_current().map_err(|e| ServerError::CannotSchedule {
            reason: e.to_string(),
        })?;

        service.load_configuration();

        let mut inner = self.inner();
        if inner.active.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let id = self.task_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        self.lock.try_lock();

        let name = service.name().to_string();
        let join = tokio::spawn(Self::main_task(
            self.strong(),
            service,
            self.args.clone(),
            token.clone(),
            id,
        ));
        inner.active = Some(ActiveTask { id, token, join });
        drop(inner);

        self.bus.publish(
            Event::now(EventKind::ServerStarting)
                .with_pid(self.pid)
                .with_reason(name),
        );
        Ok(())
    }

    /// Body of the scheduled main task.
    async fn main_task(
        server: Arc<Server>,
        service: ServiceRef,
        args: Vec<String>,
        token: CancellationToken,
        id: u64,
    ) {
        service.run(args, token).await;
        // Only the task still owning the slot releases the lock: a stale
        // predecessor unwinding after a restart must not release the hold
        // acquired on behalf of its successor.
        if server.is_current(id) {
            server.lock.unlock().await;
        }
        if server.clear_active(id) {
            server
                .bus
                .publish(Event::now(EventKind::ServerStopped).with_pid(server.pid));
        }
    }

    /// Bounded wait until the routine is done and no successor replaced it.
    ///
    /// Each pass waits on the Lock with a short recurring deadline and yields
    /// before retrying, which is what lets a `stop()` issued from another
    /// point of control (a signal, another task) interrupt the wait by
    /// clearing the slot and force-unlocking.
    async fn wait_until_idle(&self) {
        loop {
            match self.lock.wait(self.cfg.wait_interval).await {
                // Released or never locked: the routine is done unless a
                // restart re-armed the lock in the meantime.
                WaitOutcome::Released | WaitOutcome::NotLocked => {
                    if !self.is_running() {
                        break;
                    }
                }
                // Deadline elapsed: a concurrent stop may have cleared the
                // slot without a token ever reaching us.
                WaitOutcome::TimedOut => {
                    if !self.is_running() {
                        break;
                    }
                }
            }
            tokio::task::yield_now().await;
        }
        if self.is_exiting() {
            self.fire_at_exit();
        }
    }

    /// True if the slot still belongs to task `id`.
    fn is_current(&self, id: u64) -> bool {
        self.inner().active.as_ref().is_some_and(|a| a.id == id)
    }

    /// Clears the slot if it still belongs to task `id`.
    fn clear_active(&self, id: u64) -> bool {
        let mut inner = self.inner();
        match &inner.active {
            Some(active) if active.id == id => {
                inner.active = None;
                true
            }
            _ => false,
        }
    }

    /// Runs the `at_exit` hook. Taking it out of its slot is what makes this
    /// exactly-once, even under a rapid double stop/signal race.
    fn fire_at_exit(&self) {
        let hook = { self.inner().at_exit.take() };
        if let Some(hook) = hook {
            hook();
            self.bus
                .publish(Event::now(EventKind::AtExitInvoked).with_pid(self.pid));
        }
    }

    /// Poison-tolerant access to the mutable state.
    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Strong handle to self. Infallible while any `&self` exists: the
    /// controller is only ever constructed inside an `Arc`.
    fn strong(&self) -> Arc<Server> {
        self.me
            .upgrade()
            .unwrap_or_else(|| unreachable!("controller outlived its Arc"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::signal::{apply, SignalAction};
    use crate::service::ServiceFn;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn server() -> Arc<Server> {
        let mut cfg = ServerConfig::default();
        cfg.wait_interval = Duration::from_millis(20);
        Server::with_args(cfg, Vec::new(), vec!["/usr/bin/testserver".to_string()])
    }

    /// A service that runs until cancelled, counting its invocations.
    fn counting_service(runs: Arc<AtomicUsize>) -> ServiceRef {
        ServiceFn::arc("counting", move |_args: Vec<String>, ctx: CancellationToken| {
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                ctx.cancelled().await;
            }
        })
    }

    #[tokio::test]
    async fn test_start_without_service_fails() {
        let srv = server();
        assert!(matches!(
            srv.start().await,
            Err(ServerError::NoMainRoutine)
        ));
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let srv = server();
        srv.register(counting_service(Arc::new(AtomicUsize::new(0))));

        assert!(matches!(srv.launch(), Ok(Launched::Main)));
        assert!(matches!(srv.launch(), Err(ServerError::AlreadyRunning)));
        assert!(matches!(srv.launch(), Err(ServerError::AlreadyRunning)));

        srv.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_stop_when_idle_fails() {
        let srv = server();
        assert!(matches!(srv.stop().await, Err(ServerError::NotRunning)));
    }

    #[tokio::test]
    async fn test_stop_clears_handle_and_restores_lock() {
        let srv = server();
        srv.register(counting_service(Arc::new(AtomicUsize::new(0))));

        srv.launch().expect("launch");
        assert!(srv.is_running());
        assert!(srv.lock.is_locked());

        srv.stop().await.expect("stop");
        assert!(!srv.is_running());
        assert!(!srv.lock.is_locked());
    }

    #[tokio::test]
    async fn test_start_blocks_until_stop_and_fires_at_exit_once() {
        let srv = server();
        let fired = Arc::new(AtomicUsize::new(0));
        let hook_fired = Arc::clone(&fired);
        srv.register(counting_service(Arc::new(AtomicUsize::new(0))));
        srv.at_exit(move || {
            hook_fired.fetch_add(1, Ordering::SeqCst);
        });
        srv.mark_exiting();

        let runner = Arc::clone(&srv);
        let blocked = tokio::spawn(async move { runner.start().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        srv.stop().await.expect("stop");

        tokio::time::timeout(Duration::from_secs(2), blocked)
            .await
            .expect("start must unblock after stop")
            .expect("join")
            .expect("start");
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A late duplicate stop is a NotRunning no-op and must not re-fire.
        assert!(matches!(srv.stop().await, Err(ServerError::NotRunning)));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_returns_when_routine_finishes_naturally() {
        let srv = server();
        srv.register(ServiceFn::arc(
            "oneshot",
            |_args: Vec<String>, _ctx: CancellationToken| async {},
        ));

        tokio::time::timeout(Duration::from_secs(2), srv.start())
            .await
            .expect("start must return once the routine is done")
            .expect("start");
        assert!(!srv.is_running());
        assert!(!srv.lock.is_locked());
    }

    #[tokio::test]
    async fn test_restart_reruns_service_without_at_exit() {
        let srv = server();
        let runs = Arc::new(AtomicUsize::new(0));
        let fired = Arc::new(AtomicUsize::new(0));
        let hook_fired = Arc::clone(&fired);
        srv.register(counting_service(Arc::clone(&runs)));
        srv.at_exit(move || {
            hook_fired.fetch_add(1, Ordering::SeqCst);
        });

        srv.launch().expect("launch");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        srv.restart().await.expect("restart");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(srv.is_running());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        srv.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_term_signal_stops_finally() {
        let srv = server();
        let runs = Arc::new(AtomicUsize::new(0));
        let fired = Arc::new(AtomicUsize::new(0));
        let hook_fired = Arc::clone(&fired);
        srv.register(counting_service(Arc::clone(&runs)));
        srv.at_exit(move || {
            hook_fired.fetch_add(1, Ordering::SeqCst);
        });

        srv.launch().expect("launch");
        tokio::time::sleep(Duration::from_millis(20)).await;
        apply(&srv, SignalAction::Stop, "SIGTERM").await;

        assert!(srv.is_exiting());
        assert!(!srv.is_running());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // A duplicate TERM is swallowed and nothing re-fires.
        apply(&srv, SignalAction::Stop, "SIGTERM").await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hup_signal_restarts_same_service() {
        let srv = server();
        let runs = Arc::new(AtomicUsize::new(0));
        let fired = Arc::new(AtomicUsize::new(0));
        let hook_fired = Arc::clone(&fired);
        srv.register(counting_service(Arc::clone(&runs)));
        srv.at_exit(move || {
            hook_fired.fetch_add(1, Ordering::SeqCst);
        });

        srv.launch().expect("launch");
        tokio::time::sleep(Duration::from_millis(20)).await;
        apply(&srv, SignalAction::Restart, "SIGHUP").await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(!srv.is_exiting());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        srv.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_signal_stop_before_start_is_swallowed() {
        let srv = server();
        // Pre-fork phase: nothing running, the request must vanish quietly.
        apply(&srv, SignalAction::Stop, "SIGTERM").await;
        assert!(srv.is_exiting());
        assert!(!srv.is_running());
    }
}
