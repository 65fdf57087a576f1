// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervision: daemons, signals, detached children, stop/log/list.

use super::prelude::*;
use std::process::Stdio;
use std::time::{Duration, Instant};

#[test]
fn daemon_run_detaches_and_stop_tears_it_down() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  server:
    start:
      - echo serving
      - sleep 30
"#,
    );

    let out = p.run_ok(&["run", "-d", "server"]);
    assert!(out.contains("started with id "), "got: {out}");

    // The daemon writes its descriptor and logs in the background.
    wait_until("daemon descriptor", Duration::from_secs(5), || {
        stdout_str(&p.run(&["list"])).contains("server")
    });
    wait_until("daemon log line", Duration::from_secs(5), || {
        stdout_str(&p.run(&["log", "server"])).contains("serving")
    });

    let stop_out = p.run_ok(&["stop", "server"]);
    assert!(stop_out.contains("act server stopped"));

    wait_until("run dir removal", Duration::from_secs(5), || {
        p.no_runs_left()
    });
    assert!(stdout_str(&p.run(&["list"])).contains("no acts running"));
}

#[test]
fn sigint_runs_the_final_stage_and_cleans_up() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start: sleep 30
    final: echo F > final.txt
"#,
    );

    let mut child = p
        .act_cmd()
        .args(["run", "job"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Give the run time to reach the sleep.
    wait_until("run descriptor", Duration::from_secs(5), || {
        !p.no_runs_left()
    });
    std::thread::sleep(Duration::from_millis(200));

    send_signal(child.id(), "INT");
    let status = child.wait().unwrap();
    assert!(status.success());

    assert_eq!(p.read("final.txt").trim(), "F");
    assert!(p.no_runs_left());
}

#[test]
fn sigterm_interrupts_a_long_start_promptly() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start: sleep 30
"#,
    );

    let mut child = p
        .act_cmd()
        .args(["run", "job"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    wait_until("run descriptor", Duration::from_secs(5), || {
        !p.no_runs_left()
    });
    std::thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    send_signal(child.id(), "TERM");
    child.wait().unwrap();

    // The sleep's whole session was killed; nothing waited the 30s out.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(p.no_runs_left());
}

#[test]
fn detached_child_runs_independently_and_descriptors_collapse() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  parent:
    start:
      - act: child
        detach: true
      - sleep 1
  child:
    start: echo C > child.txt
"#,
    );

    p.run_ok(&["run", "parent"]);

    // The detached child did its work while the parent slept.
    assert_eq!(p.read("child.txt").trim(), "C");

    // Both descriptors are gone once everything exited.
    wait_until("descriptor cleanup", Duration::from_secs(5), || {
        p.no_runs_left()
    });
}

#[test]
fn detached_child_name_is_prefixed_with_the_parent() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  parent:
    start:
      - act: child
        detach: true
      - sleep 2
  child:
    start: sleep 2
"#,
    );

    let mut runner = p
        .act_cmd()
        .args(["run", "parent"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    wait_until("child descriptor", Duration::from_secs(5), || {
        stdout_str(&p.run(&["list"])).contains("parent::child")
    });

    runner.wait().unwrap();
}

#[test]
fn stop_kills_a_detached_child_through_its_parent() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  server:
    start:
      - act: worker
        detach: true
      - sleep 30
  worker:
    start: sleep 30
"#,
    );

    p.run_ok(&["run", "-d", "server"]);
    wait_until("descriptors", Duration::from_secs(5), || {
        stdout_str(&p.run(&["list"])).contains("server::worker")
    });

    p.run_ok(&["stop", "server"]);
    wait_until("tree teardown", Duration::from_secs(5), || {
        p.no_runs_left()
    });
}

#[test]
fn log_without_a_run_fails() {
    let p = Project::new();
    let output = p.run(&["log", "ghost"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("not found"));
}

#[test]
fn stop_without_a_run_fails() {
    let p = Project::new();
    let output = p.run(&["stop", "ghost"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("not found"));
}

#[test]
fn list_with_no_runs_prints_a_placeholder() {
    let p = Project::new();
    assert!(p.run_ok(&["list"]).contains("no acts running"));
}

#[test]
fn prefixed_log_mode_tags_output_lines() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start: echo hello
"#,
    );
    let out = p.run_ok(&["run", "-l", "prefixed", "job"]);
    assert!(out.contains("job | "), "got: {out}");
    assert!(out.trim().ends_with("hello"));
}

#[test]
fn namespace_overrides_the_log_prefix() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
namespace: ci
acts:
  job:
    start: echo hello
"#,
    );
    let out = p.run_ok(&["run", "-l", "prefixed", "job"]);
    assert!(out.contains("ci.job | "), "got: {out}");
}

#[test]
fn quiet_suppresses_command_output() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start: echo loud
"#,
    );
    let out = p.run_ok(&["run", "-q", "job"]);
    assert!(!out.contains("loud"));
}
