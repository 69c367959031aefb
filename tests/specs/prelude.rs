//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running `wt` and `wtd` against an isolated
//! config directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

// Aggressive timeouts for fast tests.
const WT_TIMEOUT_EXIT_MS: &str = "2000";
const WT_TIMEOUT_IPC_MS: &str = "2000";

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn wt_binary() -> PathBuf {
    binary_path("wt")
}

pub fn wtd_binary() -> PathBuf {
    binary_path("wtd")
}

/// Create a CLI builder for wt commands
pub fn cli() -> CliBuilder {
    CliBuilder::new(wt_binary())
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            envs: vec![
                ("WT_TIMEOUT_EXIT_MS".into(), WT_TIMEOUT_EXIT_MS.into()),
                ("WT_TIMEOUT_IPC_MS".into(), WT_TIMEOUT_IPC_MS.into()),
            ],
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Add a path argument
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(self.program);
        cmd.args(&self.args);
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stdout does not contain substring.
    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

// =============================================================================
// Workspace
// =============================================================================

/// Isolated config directory plus a scratch area for sync folders.
///
/// A standalone daemon started through [`Workspace::start_daemon`] is killed
/// on drop.
pub struct Workspace {
    config_dir: tempfile::TempDir,
    folders: tempfile::TempDir,
    daemon: Option<Child>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            config_dir: tempfile::tempdir().unwrap(),
            folders: tempfile::tempdir().unwrap(),
            daemon: None,
        }
    }

    pub fn config_path(&self) -> &Path {
        self.config_dir.path()
    }

    /// Create an initialized sync folder (contains `.wt`).
    pub fn sync_folder(&self, name: &str) -> PathBuf {
        let dir = self.folders.path().join(name);
        std::fs::create_dir_all(dir.join(".wt")).unwrap();
        dir.canonicalize().unwrap()
    }

    /// Create a plain directory.
    pub fn plain_folder(&self, name: &str) -> PathBuf {
        let dir = self.folders.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir.canonicalize().unwrap()
    }

    /// Run wt against this workspace's config directory
    pub fn wt(&self) -> CliBuilder {
        cli().env("WT_CONFIG_DIR", self.config_path())
    }

    /// Run wtd against this workspace's config directory
    pub fn wtd(&self) -> CliBuilder {
        CliBuilder::new(wtd_binary()).env("WT_CONFIG_DIR", self.config_path())
    }

    /// Start a standalone wtd and wait for its socket.
    pub fn start_daemon(&mut self) {
        let child = self
            .wtd()
            .command()
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("wtd should start");
        self.daemon = Some(child);

        let socket = self.config_path().join("daemon.sock");
        let ready = wait_for(SPEC_WAIT_MAX_MS, || socket.exists());
        assert!(ready, "wtd did not create its socket\n{}", self.daemon_log());
    }

    /// Wait for the standalone wtd to exit on its own.
    pub fn wait_daemon_exit(&mut self) -> bool {
        let Some(child) = self.daemon.as_mut() else {
            return true;
        };
        wait_for(SPEC_WAIT_MAX_MS, || matches!(child.try_wait(), Ok(Some(_))))
    }

    pub fn daemon_log(&self) -> String {
        let log_path = self.config_path().join("daemon.log");
        std::fs::read_to_string(log_path).unwrap_or_else(|_| "(no daemon log)".to_string())
    }

    pub fn pid_file_exists(&self) -> bool {
        self.config_path().join("daemon.pid").exists()
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(mut child) = self.daemon.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
