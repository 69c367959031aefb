//! Standalone daemon lifecycle specs.

use crate::prelude::*;

#[test]
fn status_without_daemon() {
    let ws = Workspace::new();
    ws.wt().args(&["status"]).passes().stdout_eq("wtd is not running\n");
}

#[test]
fn stop_without_daemon() {
    let ws = Workspace::new();
    ws.wt().args(&["stop"]).passes().stdout_eq("wtd is not running\n");
}

#[test]
fn status_reports_running_daemon() {
    let mut ws = Workspace::new();
    ws.start_daemon();

    ws.wt()
        .args(&["status"])
        .passes()
        .stdout_has("wtd is running (pid: ");
}

#[test]
fn second_daemon_refuses_to_start() {
    let mut ws = Workspace::new();
    ws.start_daemon();

    ws.wtd()
        .fails()
        .stderr_has("wtd is already running")
        .stderr_has("pid: ");
}

#[test]
fn add_goes_through_running_daemon() {
    let mut ws = Workspace::new();
    ws.start_daemon();
    let folder = ws.sync_folder("shared");

    ws.wt()
        .args(&["add"])
        .arg_path(&folder)
        .passes()
        .stdout_has("Adding folder successful.");

    ws.wt()
        .args(&["list"])
        .passes()
        .stdout_eq(&format!("watching  {}\n", folder.display()));

    // the daemon keeps running after the front end exits
    ws.wt()
        .args(&["status"])
        .passes()
        .stdout_has("wtd is running");
}

#[test]
fn stop_shuts_down_running_daemon() {
    let mut ws = Workspace::new();
    ws.start_daemon();

    ws.wt().args(&["stop"]).passes().stdout_eq("wtd stopped\n");

    assert!(ws.wait_daemon_exit(), "wtd did not exit\n{}", ws.daemon_log());
    assert!(!ws.pid_file_exists());
    ws.wt()
        .args(&["status"])
        .passes()
        .stdout_has("wtd is not running")
        .stdout_lacks("last start failed");
}

#[test]
fn daemon_log_has_startup_marker() {
    let mut ws = Workspace::new();
    ws.start_daemon();

    let log = ws.daemon_log();
    assert!(log.contains("--- wtd: starting (pid: "), "log: {log}");
}
