// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for behavioral specifications.
//!
//! Each spec builds a scratch project in a temp directory and drives the
//! built `act` binary against it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Polling cadence for eventually-true assertions.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Returns the path to the act binary.
///
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR points at a stale checkout.
pub fn act_binary() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("../../target/debug/act");
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where act is built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("act");
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// A scratch project directory with manifests and a way to run `act` in it.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file, creating parent directories.
    pub fn file(&self, rel: &str, content: &str) -> &Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        self
    }

    /// The default manifest.
    pub fn actfile(&self, content: &str) -> &Self {
        self.file("actfile.yml", content)
    }

    /// A Command for the act binary, rooted in this project.
    pub fn act_cmd(&self) -> Command {
        let mut cmd = Command::new(act_binary());
        cmd.current_dir(self.dir.path());
        cmd.env("NO_COLOR", "1");
        cmd
    }

    /// Run `act` to completion and capture its output.
    pub fn run(&self, args: &[&str]) -> Output {
        self.act_cmd().args(args).output().unwrap()
    }

    /// Run `act` and require success, returning stdout.
    pub fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "act {:?} failed\nstdout: {}\nstderr: {}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        stdout_str(&output)
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.dir.path().join(rel).exists()
    }

    /// The run descriptor directory.
    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join(".actdt")
    }

    /// True when no run descriptors remain.
    pub fn no_runs_left(&self) -> bool {
        match std::fs::read_dir(self.data_dir()) {
            Ok(entries) => entries.count() == 0,
            Err(_) => true,
        }
    }
}

pub fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Wait until the condition holds, panicking after the deadline.
pub fn wait_until(what: &str, deadline: Duration, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    panic!("timed out waiting for {what}");
}

/// Send a signal to a process by pid.
pub fn send_signal(pid: u32, signal: &str) {
    Command::new("kill")
        .args([format!("-{signal}"), pid.to_string()])
        .status()
        .unwrap();
}
