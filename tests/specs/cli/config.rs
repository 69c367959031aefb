//! Front-end config file specs.

use crate::prelude::*;

#[test]
fn first_run_writes_example_config() {
    let ws = Workspace::new();
    ws.wt().args(&["list"]).passes();

    assert!(ws.config_path().join("wt-example.toml").exists());
    assert!(!ws.config_path().join("wt.toml").exists());
}

#[test]
fn malformed_config_falls_back_to_defaults() {
    let ws = Workspace::new();
    std::fs::write(ws.config_path().join("wt.toml"), "tray = [").unwrap();

    ws.wt()
        .args(&["list"])
        .passes()
        .stdout_eq("No watched folders\n");
}

#[test]
fn unknown_config_keys_do_not_abort() {
    let ws = Workspace::new();
    std::fs::write(ws.config_path().join("wt.toml"), "colour = \"red\"\n").unwrap();

    ws.wt().args(&["status"]).passes().stdout_eq("wtd is not running\n");
}
