//! `wt add` / `wt list` specs against an embedded daemon.

use crate::prelude::*;

#[test]
fn add_sync_folder_then_list_it() {
    let ws = Workspace::new();
    let folder = ws.sync_folder("photos");

    ws.wt()
        .args(&["add"])
        .arg_path(&folder)
        .passes()
        .stdout_has(&format!("Adding folder {} ... DONE.", folder.display()))
        .stdout_has("Reloading daemon ... DONE.")
        .stdout_has("Refreshing watch list ... DONE.")
        .stdout_has("Adding folder successful.");

    ws.wt()
        .args(&["list"])
        .passes()
        .stdout_eq(&format!("watching  {}\n", folder.display()));
}

#[test]
fn add_plain_folder_fails_validation() {
    let ws = Workspace::new();
    let folder = ws.plain_folder("documents");

    ws.wt()
        .args(&["add"])
        .arg_path(&folder)
        .fails()
        .stderr_has("not a sync folder");

    ws.wt().args(&["list"]).passes().stdout_eq("No watched folders\n");
}

#[test]
fn add_missing_folder_fails_validation() {
    let ws = Workspace::new();
    let folder = ws.config_path().join("nowhere");

    ws.wt()
        .args(&["add"])
        .arg_path(&folder)
        .fails()
        .stderr_has("folder does not exist");
}

#[test]
fn add_same_folder_twice_reports_conflict() {
    let ws = Workspace::new();
    let folder = ws.sync_folder("music");

    ws.wt().args(&["add"]).arg_path(&folder).passes();

    ws.wt()
        .args(&["add"])
        .arg_path(&folder)
        .fails()
        .stdout_has("ERROR.")
        .stdout_has("Unable to add folder (code: 409)")
        .stdout_lacks("Adding folder successful.");
}

#[test]
fn reload_reports_watch_count() {
    let ws = Workspace::new();
    let folder = ws.sync_folder("notes");
    ws.wt().args(&["add"]).arg_path(&folder).passes();

    ws.wt().args(&["reload"]).passes().stdout_has("1");
}

#[test]
fn removed_folder_is_listed_as_missing() {
    let ws = Workspace::new();
    let folder = ws.sync_folder("scratch");
    ws.wt().args(&["add"]).arg_path(&folder).passes();

    std::fs::remove_dir_all(&folder).unwrap();

    ws.wt()
        .args(&["list"])
        .passes()
        .stdout_eq(&format!("missing   {}\n", folder.display()));
}

#[test]
fn embedded_daemon_does_not_outlive_command() {
    let ws = Workspace::new();
    ws.wt().args(&["list"]).passes();

    assert!(!ws.pid_file_exists());
    ws.wt().args(&["status"]).passes().stdout_eq("wtd is not running\n");
}
