// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Front-end presentation config (`wt.toml`).
//!
//! A missing file is not an error: an example file is written next to
//! where `wt.toml` would live and defaults are used. A broken file is
//! logged and ignored.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "wt.toml";
pub const EXAMPLE_FILE: &str = "wt-example.toml";

const EXAMPLE: &str = r#"# Copy to wt.toml to customize.

# Tray variant: "default", "app-indicator" or "osx-notification-center"
tray = "default"

# Icon theme: "default" or "monochrome"
theme = "default"
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Tray {
    #[default]
    Default,
    AppIndicator,
    OsxNotificationCenter,
}

impl fmt::Display for Tray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tray::Default => write!(f, "default"),
            Tray::AppIndicator => write!(f, "app-indicator"),
            Tray::OsxNotificationCenter => write!(f, "osx-notification-center"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Default,
    Monochrome,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Default => write!(f, "default"),
            Theme::Monochrome => write!(f, "monochrome"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontendConfig {
    pub tray: Tray,
    pub theme: Theme,
}

impl FrontendConfig {
    /// Parse `dir/wt.toml`. `Ok(None)` when the file does not exist.
    pub fn read(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse { path, source })
    }

    /// Load config from `dir`, falling back to defaults.
    pub fn load(dir: &Path) -> Self {
        match Self::read(dir) {
            Ok(Some(config)) => config,
            Ok(None) => {
                if let Err(e) = write_example(dir) {
                    warn!(error = %e, "failed to write example config");
                }
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "ignoring config, using defaults");
                Self::default()
            }
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, tray: Option<Tray>, theme: Option<Theme>) -> Self {
        if let Some(tray) = tray {
            self.tray = tray;
        }
        if let Some(theme) = theme {
            self.theme = theme;
        }
        self
    }
}

fn write_example(dir: &Path) -> std::io::Result<()> {
    let path = dir.join(EXAMPLE_FILE);
    if path.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, EXAMPLE)?;
    info!(path = %path.display(), "wrote example config");
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
