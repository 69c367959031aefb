// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::daemon_process::EmbeddedLauncher;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn status_without_pid_file_is_not_running() {
    let dir = tempdir().unwrap();
    assert_eq!(status_line(&Config::in_dir(dir.path())), "wtd is not running");
}

#[test]
fn status_reports_last_startup_failure() {
    let dir = tempdir().unwrap();
    let config = Config::in_dir(dir.path());
    wt_daemon::logging::write_startup_marker(&config.log_path).unwrap();
    wt_daemon::logging::write_startup_error(&config.log_path, &"Failed to bind socket");

    assert_eq!(
        status_line(&config),
        "wtd is not running\n  last start failed: Failed to bind socket"
    );
}

#[test]
fn status_reports_live_pid() {
    let dir = tempdir().unwrap();
    let config = Config::in_dir(dir.path());
    let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    std::fs::write(&config.pid_path, format!("{}\n", child.id())).unwrap();

    assert_eq!(
        status_line(&config),
        format!("wtd is running (pid: {})", child.id())
    );

    child.kill().unwrap();
    child.wait().unwrap();
}

#[tokio::test]
async fn stop_without_daemon_is_a_no_op() {
    let dir = tempdir().unwrap();
    let config = Config::in_dir(dir.path());

    stop(&config, Duration::from_millis(100), Duration::from_millis(100))
        .await
        .unwrap();

    assert!(!config.pid_path.exists());
}

#[tokio::test]
async fn run_exits_when_owned_daemon_stops() {
    let dir = tempdir().unwrap();
    let config = Config::in_dir(dir.path());
    let session = Session::open(
        MessageBus::new(),
        config.clone(),
        Arc::new(EmbeddedLauncher::new(config.clone())),
    )
    .await;
    let process = Arc::clone(session.process().unwrap());

    let running = tokio::spawn(run(
        session,
        FrontendConfig::default(),
        Duration::from_secs(2),
    ));
    process.stop();

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!config.pid_path.exists());
}
