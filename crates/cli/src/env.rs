// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for a single daemon round-trip made by a command
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("WT_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for the daemon to exit after being asked to stop
pub fn timeout_exit() -> Duration {
    parse_duration_ms("WT_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval while waiting for a process to exit
pub fn poll_interval() -> Duration {
    Duration::from_millis(50)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
