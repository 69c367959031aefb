// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Resolve config directory: WT_CONFIG_DIR > XDG_CONFIG_HOME/wt > ~/.config/wt
pub fn config_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("WT_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("wt"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoConfigDir)?;
    Ok(home.join(".config/wt"))
}
