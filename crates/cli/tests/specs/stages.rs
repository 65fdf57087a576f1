// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage machine semantics: ordering, parallelism, final-stage guarantees.

use super::prelude::*;
use std::time::{Duration, Instant};

#[test]
fn before_start_final_run_in_order() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    before: echo B
    start: echo S
    final: echo F
"#,
    );
    assert_eq!(p.run_ok(&["run", "job"]), "B\nS\nF\n");
}

#[test]
fn final_runs_when_start_fails_and_the_code_propagates() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start:
      - echo S
      - exit 4
      - echo skipped
    final: echo F
"#,
    );
    let output = p.run(&["run", "job"]);
    assert_eq!(output.status.code(), Some(4));
    let out = stdout_str(&output);
    assert!(out.contains("S\n"));
    assert!(out.contains("F\n"));
    assert!(!out.contains("skipped"));
}

#[test]
fn parallel_commands_overlap() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start:
      parallel: true
      cmds:
        - sleep 1; echo a
        - echo b
"#,
    );
    let started = Instant::now();
    let out = p.run_ok(&["run", "job"]);
    let elapsed = started.elapsed();

    // The fast command finishes first; the stage takes about one sleep,
    // not one per command.
    assert_eq!(out, "b\na\n");
    assert!(elapsed < Duration::from_secs(2), "stage took {elapsed:?}");
}

#[test]
fn legacy_cmds_with_parallel_fold_into_start() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    parallel: true
    cmds:
      - sleep 1; echo a
      - echo b
"#,
    );
    assert_eq!(p.run_ok(&["run", "job"]), "b\na\n");
}

#[test]
fn before_all_runs_once_per_manifest() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
before-all:
  cmds:
    - echo R
acts:
  one:
    start:
      - echo 1
      - act: two
  two:
    start: echo 2
"#,
    );
    assert_eq!(p.run_ok(&["run", "one"]), "R\n1\n2\n");
}

#[test]
fn included_manifest_before_all_runs_lazily_and_once() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
before-all:
  cmds:
    - echo R
acts:
  both:
    start:
      - act: sub.x
      - act: sub.y
  sub:
    include: child/actfile.yml
"#,
    )
    .file(
        "child/actfile.yml",
        r#"
version: "1"
before-all:
  cmds:
    - echo C
acts:
  x:
    start: echo X
  y:
    start: echo Y
"#,
    );
    assert_eq!(p.run_ok(&["run", "both"]), "R\nC\nX\nY\n");
}

#[test]
fn nested_act_calls_unwind_their_finals_innermost_first() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  outer:
    start:
      - act: inner
    final: echo outer-final
  inner:
    start: echo inner-start
    final: echo inner-final
"#,
    );
    assert_eq!(
        p.run_ok(&["run", "outer"]),
        "inner-start\ninner-final\nouter-final\n"
    );
}

#[test]
fn teardown_still_works_as_a_final_alias() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start: echo S
    teardown: echo T
"#,
    );
    assert_eq!(p.run_ok(&["run", "job"]), "S\nT\n");
}

#[test]
fn loop_over_manifests_with_mismatch_allow() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  setup-all:
    start:
      - act: setup
        from: "{{.LoopItem}}"
        mismatch: allow
        loop:
          glob: "services/*/actfile.yml"
"#,
    )
    .file(
        "services/a/actfile.yml",
        "version: \"1\"\nacts:\n  setup:\n    start: echo setup-a\n",
    )
    .file(
        "services/b/actfile.yml",
        "version: \"1\"\nacts:\n  unrelated:\n    start: echo nope\n",
    )
    .file(
        "services/c/actfile.yml",
        "version: \"1\"\nacts:\n  setup:\n    start: echo setup-c\n",
    );
    assert_eq!(p.run_ok(&["run", "setup-all"]), "setup-a\nsetup-c\n");
}
