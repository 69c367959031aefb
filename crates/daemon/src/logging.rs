// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log file setup shared by the daemon binary and the front end.

use std::io::Write;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- wtd: starting (pid: 12345)"
pub const STARTUP_MARKER_PREFIX: &str = "--- wtd: starting (pid: ";

/// Append the startup marker for this process to `log_path`.
pub fn write_startup_marker(log_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{})", STARTUP_MARKER_PREFIX, std::process::id())
}

/// Write a startup error synchronously, bypassing the non-blocking writer
/// so it is on disk even if the process exits right after.
pub fn write_startup_error(log_path: &Path, error: &dyn std::fmt::Display) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

/// Extract the errors logged since the most recent startup marker.
pub fn parse_startup_error(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let errors: Vec<String> = content[start_pos..]
        .lines()
        .filter(|line| line.contains("ERROR"))
        .map(|line| {
            line.split_once(": ")
                .map(|(_, msg)| msg.to_string())
                .unwrap_or_else(|| line.to_string())
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

/// Errors from the most recent start recorded in `log_path`, if any.
pub fn read_startup_error(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;
    parse_startup_error(&content)
}

/// Install a tracing subscriber writing to `log_path`.
///
/// The returned guard flushes the non-blocking writer on drop; hold it for
/// the life of the process.
pub fn setup(log_path: &Path) -> std::io::Result<WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "log path has no parent")
    })?;
    let file_name = log_path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "log path has no file name")
    })?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding hosts)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
