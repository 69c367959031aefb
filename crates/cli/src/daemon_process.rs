// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process lifecycle.
//!
//! Decides whether a daemon is already alive (PID file plus a live
//! process), launches one on its own task when none is, and owns the
//! shutdown of a daemon this process started.

use std::fmt;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};
use wt_core::{ControlCommand, Handler, Message, MessageBus, MessageKind};
use wt_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use wt_daemon::{RequestHandler, WatchService};

/// Lifecycle of the daemon as seen by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonProcessState {
    NotRunning,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl DaemonProcessState {
    /// Whether moving from `self` to `next` is permitted.
    ///
    /// Forward only, except `Running -> Stopped` when the daemon dies.
    /// `NotRunning -> Running` covers a daemon found already alive.
    pub fn can_transition_to(self, next: DaemonProcessState) -> bool {
        use DaemonProcessState::*;
        matches!(
            (self, next),
            (NotRunning, Starting)
                | (NotRunning, Running)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Running, ShuttingDown)
                | (Running, Stopped)
                | (ShuttingDown, Stopped)
                | (Stopped, Starting)
        )
    }
}

impl fmt::Display for DaemonProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonProcessState::NotRunning => write!(f, "not running"),
            DaemonProcessState::Starting => write!(f, "starting"),
            DaemonProcessState::Running => write!(f, "running"),
            DaemonProcessState::ShuttingDown => write!(f, "shutting down"),
            DaemonProcessState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("daemon task ended before it was ready")]
    Exited,
}

/// A daemon body started by this process.
pub struct LaunchedDaemon {
    /// Answers requests in-process
    pub handler: Arc<dyn RequestHandler>,
    /// Completes when the daemon has shut down
    pub task: JoinHandle<()>,
}

/// Starts a daemon body in this process.
#[async_trait]
pub trait DaemonLauncher: Send + Sync {
    /// Launch on a background task, resolving once the daemon is ready.
    async fn launch(&self, bus: &MessageBus) -> Result<LaunchedDaemon, LaunchError>;
}

/// Runs the watch daemon on a tokio task sharing this process's bus.
pub struct EmbeddedLauncher {
    config: Config,
}

impl EmbeddedLauncher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DaemonLauncher for EmbeddedLauncher {
    async fn launch(&self, bus: &MessageBus) -> Result<LaunchedDaemon, LaunchError> {
        let config = self.config.clone();
        let bus = bus.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let StartupResult { daemon, listener } = match lifecycle::startup(&config).await {
                Ok(result) => result,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let service = daemon.service();
            let control = bus.register(Arc::new(ControlBridge {
                service: Arc::downgrade(&service),
            }));
            let _ = ready_tx.send(Ok(service));

            // Stops through the service: a Shutdown request or bus Control
            if let Err(e) = daemon.run(listener, std::future::pending()).await {
                error!("embedded daemon shutdown failed: {}", e);
            }
            bus.unsubscribe(control);
        });

        match ready_rx.await {
            Ok(Ok(service)) => Ok(LaunchedDaemon {
                handler: service,
                task,
            }),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(LaunchError::Exited),
        }
    }
}

/// Applies bus `Control` messages to an in-process daemon.
struct ControlBridge {
    service: Weak<WatchService>,
}

#[async_trait]
impl Handler for ControlBridge {
    fn interests(&self) -> &[MessageKind] {
        &[MessageKind::Control]
    }

    async fn handle(&self, message: Message) {
        let Message::Control(command) = message else {
            return;
        };
        let Some(service) = self.service.upgrade() else {
            return;
        };
        match command {
            ControlCommand::Shutdown => service.request_shutdown(),
            ControlCommand::Reload => match service.reload() {
                Ok(count) => info!(count, "reloaded watches"),
                Err(e) => warn!(error = %e, "reload failed"),
            },
        }
    }
}

struct OwnedDaemon {
    handler: Arc<dyn RequestHandler>,
    daemon: AbortHandle,
    monitor: JoinHandle<()>,
}

/// Owns the daemon lifecycle for this process.
pub struct DaemonProcess {
    config: Config,
    bus: MessageBus,
    launcher: Arc<dyn DaemonLauncher>,
    state: Arc<Mutex<DaemonProcessState>>,
    transitions: broadcast::Sender<DaemonProcessState>,
    start_lock: tokio::sync::Mutex<()>,
    owned: Mutex<Option<OwnedDaemon>>,
}

impl DaemonProcess {
    pub fn new(config: Config, bus: MessageBus, launcher: Arc<dyn DaemonLauncher>) -> Self {
        let (transitions, _) = broadcast::channel(16);
        Self {
            config,
            bus,
            launcher,
            state: Arc::new(Mutex::new(DaemonProcessState::NotRunning)),
            transitions,
            start_lock: tokio::sync::Mutex::new(()),
            owned: Mutex::new(None),
        }
    }

    pub fn state(&self) -> DaemonProcessState {
        *self.state.lock()
    }

    /// Every state entered from now on, in order.
    pub fn transitions(&self) -> broadcast::Receiver<DaemonProcessState> {
        self.transitions.subscribe()
    }

    /// Wait until the daemon is `Stopped`.
    pub async fn stopped(&self) {
        let mut transitions = self.transitions();
        while self.state() != DaemonProcessState::Stopped {
            match transitions.recv().await {
                Ok(DaemonProcessState::Stopped) => return,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Whether this process started the daemon it is talking to.
    pub fn is_owned(&self) -> bool {
        self.owned.lock().is_some()
    }

    /// In-process handler of a daemon this process started.
    pub fn handler(&self) -> Option<Arc<dyn RequestHandler>> {
        self.owned.lock().as_ref().map(|o| Arc::clone(&o.handler))
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Whether any daemon process is alive according to the PID file.
    ///
    /// Our own PID only counts while we own a daemon; otherwise it was
    /// left behind by an embedded daemon that died.
    pub fn is_running(&self) -> bool {
        match read_pid(&self.config.pid_path) {
            Some(pid) if pid == std::process::id() => self.is_owned(),
            Some(pid) => process_exists(pid),
            None => false,
        }
    }

    /// Ensure a daemon is running, launching one in-process if none is.
    ///
    /// Concurrent calls collapse into one launch. Launch failures leave
    /// the state `Stopped` and are logged rather than returned.
    pub async fn start(&self) -> DaemonProcessState {
        let _guard = self.start_lock.lock().await;

        let current = self.state();
        match current {
            DaemonProcessState::Running | DaemonProcessState::ShuttingDown => return current,
            // Starting here means an earlier start was cancelled mid-launch
            DaemonProcessState::NotRunning
            | DaemonProcessState::Starting
            | DaemonProcessState::Stopped => {}
        }

        if current == DaemonProcessState::Stopped {
            // The previous daemon's task has ended
            self.owned.lock().take();
        }

        if self.is_running() {
            info!("daemon already running, not starting another");
            if current == DaemonProcessState::Stopped {
                self.transition(DaemonProcessState::Starting);
            }
            self.transition(DaemonProcessState::Running);
            return self.state();
        }

        if current != DaemonProcessState::Starting {
            self.transition(DaemonProcessState::Starting);
        }
        match self.launcher.launch(&self.bus).await {
            Ok(launched) => {
                let daemon = launched.task.abort_handle();
                let monitor = self.monitor(launched.task);
                *self.owned.lock() = Some(OwnedDaemon {
                    handler: launched.handler,
                    daemon,
                    monitor,
                });
                self.transition(DaemonProcessState::Running);
                info!("embedded daemon started");
            }
            Err(e) => {
                error!(error = %e, "failed to start embedded daemon");
                self.transition(DaemonProcessState::Stopped);
            }
        }
        self.state()
    }

    /// Ask a daemon this process started to shut down.
    ///
    /// A daemon owned by another process is left alone.
    pub fn stop(&self) -> DaemonProcessState {
        if !self.is_owned() {
            debug!("daemon not owned by this process, not stopping it");
            return self.state();
        }
        if self.transition(DaemonProcessState::ShuttingDown) {
            self.bus
                .publish(Message::Control(ControlCommand::Shutdown));
        }
        self.state()
    }

    /// Wait up to `timeout` for an owned daemon to finish, then cancel it.
    pub async fn shutdown(&self, timeout: Duration) {
        let Some(owned) = self.owned.lock().take() else {
            return;
        };

        let mut monitor = owned.monitor;
        if tokio::time::timeout(timeout, &mut monitor).await.is_err() {
            warn!("daemon did not stop within {:?}, cancelling", timeout);
            owned.daemon.abort();
            monitor.abort();
            let mut state = self.state.lock();
            if state.can_transition_to(DaemonProcessState::Stopped) {
                *state = DaemonProcessState::Stopped;
                let _ = self.transitions.send(DaemonProcessState::Stopped);
            }
        }
    }

    /// Watch the daemon task; its end means the daemon stopped, whether
    /// asked to or not.
    fn monitor(&self, task: JoinHandle<()>) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let transitions = self.transitions.clone();
        tokio::spawn(async move {
            let result = task.await;
            let mut state = state.lock();
            match *state {
                DaemonProcessState::Running => {
                    warn!(?result, "daemon stopped unexpectedly");
                }
                DaemonProcessState::ShuttingDown => {
                    info!("daemon stopped");
                }
                _ => return,
            }
            *state = DaemonProcessState::Stopped;
            let _ = transitions.send(DaemonProcessState::Stopped);
        })
    }

    fn transition(&self, next: DaemonProcessState) -> bool {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            warn!(from = %*state, to = %next, "ignoring invalid daemon state transition");
            return false;
        }
        debug!(from = %*state, to = %next, "daemon state");
        *state = next;
        let _ = self.transitions.send(next);
        true
    }
}

/// Read the PID recorded in the liveness marker, if any.
pub fn read_pid(pid_path: &Path) -> Option<u32> {
    std::fs::read_to_string(pid_path)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
}

/// True only if the PID file exists and names a live process. I/O
/// failures count as not running.
pub fn is_running(pid_path: &Path) -> bool {
    read_pid(pid_path).is_some_and(process_exists)
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Wait for the daemon recorded in `pid_path` to exit.
pub async fn wait_for_exit(pid_path: &Path, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !is_running(pid_path) {
            return true;
        }
        tokio::time::sleep(crate::env::poll_interval()).await;
    }
    false
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
