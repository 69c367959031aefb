// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage-local folder validation.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Directory marking an initialized sync root.
pub const APP_MARKER: &str = ".wt";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no folder selected")]
    Empty,
    #[error("folder does not exist: {0}")]
    NotFound(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("not a sync folder (missing {APP_MARKER}): {0}")]
    NotAnAppFolder(PathBuf),
    #[error("already a sync folder: {0}")]
    AlreadyAnAppFolder(PathBuf),
    #[error("parent folder does not exist: {0}")]
    NoParent(PathBuf),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a folder stage accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderValidation {
    /// An existing directory that is already an initialized sync root.
    AppFolder,
    /// A directory that is not yet a sync root. It may not exist yet as
    /// long as its parent does.
    NoAppFolder,
}

impl FolderValidation {
    /// Check `path`, returning the form to hand to the daemon.
    ///
    /// Existing folders are canonicalized.
    pub fn validate(self, path: &Path) -> Result<PathBuf, ValidationError> {
        if path.as_os_str().is_empty() {
            return Err(ValidationError::Empty);
        }

        match self {
            FolderValidation::AppFolder => {
                let dir = existing_dir(path)?;
                if !dir.join(APP_MARKER).is_dir() {
                    return Err(ValidationError::NotAnAppFolder(dir));
                }
                Ok(dir)
            }
            FolderValidation::NoAppFolder => {
                if !path.exists() {
                    return match path.parent() {
                        Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => {
                            Ok(path.to_path_buf())
                        }
                        _ => Err(ValidationError::NoParent(path.to_path_buf())),
                    };
                }
                let dir = existing_dir(path)?;
                if dir.join(APP_MARKER).exists() {
                    return Err(ValidationError::AlreadyAnAppFolder(dir));
                }
                Ok(dir)
            }
        }
    }
}

fn existing_dir(path: &Path) -> Result<PathBuf, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ValidationError::NotADirectory(path.to_path_buf()));
    }
    path.canonicalize().map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
