// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wt status`, `wt stop` and `wt run`

use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use wt_core::{Command, ControlCommand, Message, MessageBus, StatusCode};
use wt_daemon::lifecycle::Config;
use wt_daemon::logging::read_startup_error;

use super::ensure_success;
use crate::app::Session;
use crate::config::FrontendConfig;
use crate::daemon_process::{is_running, read_pid, wait_for_exit};

/// Report whether a daemon is alive. Never starts one.
pub fn status(config: &Config) -> Result<()> {
    println!("{}", status_line(config));
    Ok(())
}

fn status_line(config: &Config) -> String {
    match read_pid(&config.pid_path) {
        Some(pid) if is_running(&config.pid_path) => format!("wtd is running (pid: {pid})"),
        _ => match read_startup_error(&config.log_path) {
            Some(error) => format!("wtd is not running\n  last start failed: {error}"),
            None => "wtd is not running".to_string(),
        },
    }
}

/// Ask a running daemon to shut down and wait for it to go. Never starts
/// one.
pub async fn stop(config: &Config, ipc_timeout: Duration, exit_timeout: Duration) -> Result<()> {
    if !is_running(&config.pid_path) {
        println!("wtd is not running");
        return Ok(());
    }

    let session = Session::attach(MessageBus::new(), config).await;
    let response = session
        .call(
            Command::Control {
                command: ControlCommand::Shutdown,
            },
            ipc_timeout,
        )
        .await;
    session.close(exit_timeout).await;

    // The daemon may exit before its reply is flushed, so a lost
    // connection is judged by whether the process went away.
    if response.code != StatusCode::UNAVAILABLE {
        ensure_success(&response)?;
    }

    if wait_for_exit(&config.pid_path, exit_timeout).await {
        println!("wtd stopped");
        Ok(())
    } else {
        ensure_success(&response)?;
        Err(anyhow!("wtd did not stop within {:?}", exit_timeout))
    }
}

/// Stay attached until Ctrl-C, an exit request, or the owned daemon
/// stopping.
pub async fn run(
    mut session: Session,
    frontend: FrontendConfig,
    exit_timeout: Duration,
) -> Result<()> {
    println!(
        "wt running ({} transport, tray: {}, theme: {})",
        session.mode(),
        frontend.tray,
        frontend.theme
    );
    if !session.is_connected() {
        warn!("daemon unavailable, requests will fail");
        println!("wt: daemon unavailable");
    }

    let watcher = session.process().filter(|p| p.is_owned()).cloned().map(|process| {
        let bus = session.bus().clone();
        tokio::spawn(async move {
            process.stopped().await;
            info!("daemon stopped, exiting");
            bus.publish(Message::ExitRequested);
        })
    });

    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl-C"),
            Err(e) => {
                warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };
    let interrupted = tokio::select! {
        _ = session.wait_for_exit() => false,
        _ = ctrl_c => true,
    };
    if interrupted {
        session.request_exit();
        session.wait_for_exit().await;
    }
    if let Some(watcher) = watcher {
        watcher.abort();
    }

    session.close(exit_timeout).await;
    println!("wt stopped");
    Ok(())
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
