// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wt - front end for the watch daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod app;
mod commands;
mod config;
mod daemon_process;
mod env;
mod exit_error;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{add, daemon, watch};
use tracing::info;
use wt_daemon::lifecycle::Config;

use crate::app::Session;
use crate::config::{FrontendConfig, Theme, Tray};
use crate::daemon_process::EmbeddedLauncher;

const LOG_FILE: &str = "wt.log";

#[derive(Parser)]
#[command(name = "wt", version, about = "Watch - keep folders in sync through wtd")]
struct Cli {
    /// Tray variant (overrides wt.toml)
    #[arg(long, value_enum, global = true)]
    tray: Option<Tray>,

    /// Icon theme (overrides wt.toml)
    #[arg(long, value_enum, global = true)]
    theme: Option<Theme>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an existing sync folder to the daemon
    Add {
        /// Folder containing a .wt directory
        path: PathBuf,
    },
    /// List watched folders
    List,
    /// Reload the daemon's watch list
    Reload,
    /// Show whether the daemon is running
    Status,
    /// Stop a running daemon
    Stop,
    /// Start or attach to the daemon and stay up until Ctrl-C
    Run,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, skipping the cause chain when the top-level
/// message already contains it.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            return Ok(());
        }
    };

    let config = Config::load()?;
    let _log_guard = wt_daemon::logging::setup(&config.config_dir.join(LOG_FILE))?;
    let frontend = FrontendConfig::load(&config.config_dir).with_overrides(cli.tray, cli.theme);
    info!(tray = %frontend.tray, theme = %frontend.theme, "wt starting");

    let ipc = env::timeout_ipc();
    let exit = env::timeout_exit();

    // status and stop never start a daemon
    match command {
        Commands::Status => daemon::status(&config),
        Commands::Stop => daemon::stop(&config, ipc, exit).await,
        Commands::Run => daemon::run(open_session(config).await?, frontend, exit).await,
        Commands::Add { path } => {
            let session = open_session(config).await?;
            let result = add::add(&session, &path, ipc).await;
            session.close(exit).await;
            result
        }
        Commands::List => {
            let session = open_session(config).await?;
            let result = watch::list(&session, ipc).await;
            session.close(exit).await;
            result
        }
        Commands::Reload => {
            let session = open_session(config).await?;
            let result = watch::reload(&session, ipc).await;
            session.close(exit).await;
            result
        }
    }
}

async fn open_session(config: Config) -> Result<Session> {
    let bus = wt_core::bus::init()?;
    let launcher = Arc::new(EmbeddedLauncher::new(config.clone()));
    Ok(Session::open(bus, config, launcher).await)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
