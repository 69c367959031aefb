// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wt list` and `wt reload`

use std::time::Duration;

use anyhow::Result;
use wt_core::{Command, ControlCommand, Payload, WatchEntry, WatchStatus};

use super::ensure_success;
use crate::app::Session;

pub async fn list(session: &Session, timeout: Duration) -> Result<()> {
    let response = session.call(Command::ListWatches, timeout).await;
    ensure_success(&response)?;

    let watches = match response.payload {
        Some(Payload::Watches { watches }) => watches,
        None => Vec::new(),
    };
    print!("{}", format_watches(&watches));
    Ok(())
}

pub async fn reload(session: &Session, timeout: Duration) -> Result<()> {
    let response = session
        .call(
            Command::Control {
                command: ControlCommand::Reload,
            },
            timeout,
        )
        .await;
    ensure_success(&response)?;
    println!("{}", response.message);
    Ok(())
}

fn format_watches(watches: &[WatchEntry]) -> String {
    if watches.is_empty() {
        return "No watched folders\n".to_string();
    }
    watches
        .iter()
        .map(|w| {
            let status = match w.status {
                WatchStatus::Watching => "watching",
                WatchStatus::Missing => "missing",
            };
            format!("{:<8}  {}\n", status, w.path.display())
        })
        .collect()
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
