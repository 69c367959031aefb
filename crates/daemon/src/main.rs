// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch Daemon (wtd)
//!
//! Background process that owns the watch list and answers requests from
//! `wt` over a Unix socket.

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use wt_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use wt_daemon::logging;
use wt_daemon::PROTOCOL_VERSION;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("wtd {}", PROTOCOL_VERSION);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("wtd {}", PROTOCOL_VERSION);
                println!("Watch Daemon - background process that owns the watch list");
                println!();
                println!("USAGE:");
                println!("    wtd");
                println!();
                println!("The daemon is typically started by the `wt` front end and should not");
                println!("be invoked directly. It listens on a Unix socket for requests");
                println!("from `wt`.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: wtd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Marker goes in before tracing so `wt` can find errors from this run
    logging::write_startup_marker(&config.log_path)?;
    let log_guard = logging::setup(&config.log_path)?;

    info!("Starting watch daemon");

    let StartupResult { daemon, listener } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.pid_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            let version = std::fs::read_to_string(&config.version_path)
                .unwrap_or_default()
                .trim()
                .to_string();

            eprintln!("wtd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            if !version.is_empty() {
                if version == PROTOCOL_VERSION {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated, current: {PROTOCOL_VERSION})");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Synchronous write: the non-blocking writer may not flush in time
            logging::write_startup_error(&config.log_path, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Signal ready for a parent waiting on startup
    println!("READY");

    let stop = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    };

    if let Err(e) = daemon.run(listener, stop).await {
        error!("Error during shutdown: {}", e);
    }

    drop(log_guard);
    Ok(())
}
