// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, serving, shutdown.

use std::fs::File;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::env::config_dir;
use crate::listener::Listener;
use crate::service::{ServiceError, WatchService};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root config directory (e.g. ~/.config/wt)
    pub config_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file (the liveness marker)
    pub pid_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the persisted watch list
    pub watches_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::in_dir(config_dir()?))
    }

    /// Configuration rooted at `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let config_dir = dir.into();
        Self {
            socket_path: config_dir.join("daemon.sock"),
            pid_path: config_dir.join("daemon.pid"),
            version_path: config_dir.join("daemon.version"),
            log_path: config_dir.join("daemon.log"),
            watches_path: config_dir.join("watches.json"),
            config_dir,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Watch service error: {0}")]
    Service(#[from] ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation.
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    service: Arc<WatchService>,
    shutdown_notify: Arc<Notify>,
    /// When daemon started
    pub start_time: Instant,
}

/// Result of daemon startup - the daemon state and its bound socket.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

impl DaemonState {
    /// The service answering requests for this daemon.
    pub fn service(&self) -> Arc<WatchService> {
        Arc::clone(&self.service)
    }

    /// Notified when a shutdown has been requested.
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown_notify)
    }

    /// Serve connections until a shutdown is requested through the service
    /// or `stop` resolves, then shut down.
    pub async fn run(
        mut self,
        listener: UnixListener,
        stop: impl Future<Output = ()>,
    ) -> Result<(), LifecycleError> {
        let handler: Arc<dyn crate::service::RequestHandler> = self.service();
        let accept = tokio::spawn(Listener::new(listener, handler).run());

        info!(
            "Daemon ready, listening on {}",
            self.config.socket_path.display()
        );

        tokio::select! {
            _ = self.shutdown_notify.notified() => info!("Shutdown requested via command"),
            _ = stop => info!("Shutdown requested"),
        }

        accept.abort();
        self.shutdown()
    }

    /// Shutdown the daemon: refuse further requests and remove the socket,
    /// PID and version files.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");
        self.service.request_shutdown();

        // 1. Remove socket file
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 2. Remove PID file
        if self.config.pid_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.pid_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 3. Remove version file
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        // 4. Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock.
            // Those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create config directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.config_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.pid_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    std::fs::write(&config.version_path, crate::protocol::PROTOCOL_VERSION)?;

    // 3. Load the watch list
    let shutdown = Arc::new(Notify::new());
    let service = Arc::new(WatchService::load(
        config.watches_path.clone(),
        Arc::clone(&shutdown),
    )?);

    // 4. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(pid = std::process::id(), "Daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            service,
            shutdown_notify: shutdown,
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.pid_path.exists() {
        let _ = std::fs::remove_file(&config.pid_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
