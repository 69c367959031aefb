//! Help and version output specs.

use crate::prelude::*;

#[test]
fn no_arguments_prints_usage() {
    let ws = Workspace::new();
    ws.wt()
        .passes()
        .stdout_has("Usage:")
        .stdout_has("add")
        .stdout_has("list")
        .stdout_has("stop");
}

#[test]
fn help_lists_frontend_options() {
    let ws = Workspace::new();
    ws.wt()
        .args(&["--help"])
        .passes()
        .stdout_has("--tray")
        .stdout_has("--theme");
}

#[test]
fn unknown_subcommand_fails() {
    let ws = Workspace::new();
    ws.wt().args(&["frobnicate"]).fails().stderr_has("frobnicate");
}

#[test]
fn invalid_tray_value_fails() {
    let ws = Workspace::new();
    ws.wt()
        .args(&["--tray", "dock", "status"])
        .fails()
        .stderr_has("dock");
}

#[test]
fn wtd_version_prints_version() {
    let ws = Workspace::new();
    ws.wtd()
        .args(&["--version"])
        .passes()
        .stdout_eq(&format!("wtd {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn wtd_help_prints_usage() {
    let ws = Workspace::new();
    ws.wtd()
        .args(&["--help"])
        .passes()
        .stdout_has("USAGE:")
        .stdout_has("--version");
}

#[test]
fn wtd_rejects_unknown_arguments() {
    let ws = Workspace::new();
    ws.wtd()
        .args(&["--bogus"])
        .fails()
        .stderr_has("unexpected argument '--bogus'");
}
