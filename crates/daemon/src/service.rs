// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch service: the operations the daemon performs on request.
//!
//! Folders are added to a persisted watch list (`watches.json`) and only
//! become active on the next reload, mirroring how the daemon applies its
//! configuration.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{info, warn};
use wt_core::{
    Command, ControlCommand, Payload, Request, Response, StatusCode, WatchEntry, WatchStatus,
};

/// Anything that can answer daemon requests.
///
/// Implemented by [`WatchService`]; the socket listener and the front
/// end's in-process transport both dispatch through it.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: &Request) -> Response;
}

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Folder does not exist or is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Folder is already watched: {}", .0.display())]
    AlreadyWatched(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid watch list: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotADirectory(_) => StatusCode::BAD_REQUEST,
            ServiceError::AlreadyWatched(_) => StatusCode::CONFLICT,
            ServiceError::Io(_) | ServiceError::Json(_) => StatusCode::INTERNAL,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WatchList {
    #[serde(default)]
    watches: Vec<PathBuf>,
}

impl WatchList {
    fn load(path: &Path) -> Result<Self, ServiceError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a temp file and rename so readers never see a partial list.
    fn save(&self, path: &Path) -> Result<(), ServiceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

pub struct WatchService {
    watches_path: PathBuf,
    /// Serializes read-modify-write of the persisted list
    write_lock: Mutex<()>,
    active: Mutex<Vec<PathBuf>>,
    stopping: AtomicBool,
    shutdown: Arc<Notify>,
}

impl WatchService {
    /// Load the persisted watch list and make it active.
    pub fn load(watches_path: PathBuf, shutdown: Arc<Notify>) -> Result<Self, ServiceError> {
        let list = WatchList::load(&watches_path)?;
        info!(count = list.watches.len(), "loaded watch list");
        Ok(Self {
            watches_path,
            write_lock: Mutex::new(()),
            active: Mutex::new(list.watches),
            stopping: AtomicBool::new(false),
            shutdown,
        })
    }

    /// Append a folder to the persisted list. Not active until reload.
    pub fn add_watch(&self, path: &Path) -> Result<PathBuf, ServiceError> {
        let folder = match std::fs::canonicalize(path) {
            Ok(p) if p.is_dir() => p,
            _ => return Err(ServiceError::NotADirectory(path.to_path_buf())),
        };

        let _guard = self.write_lock.lock();
        let mut list = WatchList::load(&self.watches_path)?;
        if list.watches.contains(&folder) {
            return Err(ServiceError::AlreadyWatched(folder));
        }
        list.watches.push(folder.clone());
        list.save(&self.watches_path)?;
        info!(folder = %folder.display(), "added watch");
        Ok(folder)
    }

    /// Re-read the persisted list and make it the active set.
    pub fn reload(&self) -> Result<usize, ServiceError> {
        let list = WatchList::load(&self.watches_path)?;
        let count = list.watches.len();
        *self.active.lock() = list.watches;
        info!(count, "reloaded watch list");
        Ok(count)
    }

    /// Active watches with their current on-disk state.
    pub fn watches(&self) -> Vec<WatchEntry> {
        self.active
            .lock()
            .iter()
            .map(|path| WatchEntry {
                path: path.clone(),
                status: if path.is_dir() {
                    WatchStatus::Watching
                } else {
                    WatchStatus::Missing
                },
            })
            .collect()
    }

    /// Stop answering requests and wake whoever is waiting on shutdown.
    pub fn request_shutdown(&self) {
        if !self.stopping.swap(true, Ordering::SeqCst) {
            info!("shutdown requested");
        }
        self.shutdown.notify_one();
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

impl RequestHandler for WatchService {
    fn handle(&self, request: &Request) -> Response {
        if self.is_stopping() {
            return Response::error(request, StatusCode::UNAVAILABLE, "Daemon is shutting down");
        }

        match &request.command {
            Command::AddWatch { path } => match self.add_watch(path) {
                Ok(folder) => Response::ok(request, format!("Added {}", folder.display())),
                Err(e) => {
                    warn!(error = %e, "add watch failed");
                    Response::error(request, e.status(), e.to_string())
                }
            },
            Command::Control {
                command: ControlCommand::Reload,
            } => match self.reload() {
                Ok(count) => Response::ok(request, format!("Reloaded {count} watch(es)")),
                Err(e) => {
                    warn!(error = %e, "reload failed");
                    Response::error(request, e.status(), e.to_string())
                }
            },
            Command::Control {
                command: ControlCommand::Shutdown,
            } => {
                self.request_shutdown();
                Response::ok(request, "Shutting down")
            }
            Command::ListWatches => {
                let watches = self.watches();
                Response::ok(request, format!("{} watch(es)", watches.len()))
                    .with_payload(Payload::Watches { watches })
            }
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
