// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Variable layering, flags, templating, and the runtime dotenv.

use super::prelude::*;

#[test]
fn act_envfile_overrides_manifest_envfile() {
    let p = Project::new();
    p.file("m.env", "X=m\n")
        .file("a.env", "X=a\n")
        .actfile(
            r#"
version: "1"
envfile: m.env
acts:
  job:
    envfile: a.env
    start: echo "$X"
  plain:
    start: echo "$X"
"#,
        );
    assert_eq!(p.run_ok(&["run", "job"]).trim(), "a");
    assert_eq!(p.run_ok(&["run", "plain"]).trim(), "m");
}

#[test]
fn runtime_dotenv_overrides_env_files() {
    let p = Project::new();
    p.file("m.env", "X=m\n").actfile(
        r#"
version: "1"
envfile: m.env
acts:
  job:
    start:
      - echo X=rt >> "$ACT_ENV"
      - echo "$X"
"#,
    );
    assert_eq!(p.run_ok(&["run", "job"]).trim(), "rt");
}

#[test]
fn runtime_dotenv_is_visible_to_later_sequential_commands() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start:
      - echo K=v >> "$ACT_ENV"
      - echo "$K"
"#,
    );
    assert_eq!(p.run_ok(&["run", "job"]).trim(), "v");
}

#[test]
fn flags_parse_and_export() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  foo:
    flags: ["daemon:false", name]
    start: echo "$FLAG_DAEMON $FLAG_NAME $CLI_ARGS"
"#,
    );
    assert_eq!(
        p.run_ok(&["run", "foo", "-daemon", "-name=Bruno", "a", "b"])
            .trim(),
        "true Bruno a b"
    );
}

#[test]
fn flag_defaults_apply_when_unset() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  foo:
    flags: ["daemon:false", "mode:fast"]
    start: echo "$FLAG_DAEMON $FLAG_MODE"
"#,
    );
    assert_eq!(p.run_ok(&["run", "foo"]).trim(), "false fast");
}

#[test]
fn unknown_flag_fails_the_run() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  foo:
    flags: [name]
    start: echo hi
"#,
    );
    let output = p.run(&["run", "foo", "-bogus"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("unknown flag"));
}

#[test]
fn rest_args_reach_the_shell_line() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start: echo "first=$1"
"#,
    );
    assert_eq!(p.run_ok(&["run", "job", "hello"]).trim(), "first=hello");
}

#[test]
fn act_runtime_vars_are_exported() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start: echo "{{.ActName}} $ACT_NAME"
"#,
    );
    assert_eq!(p.run_ok(&["run", "job"]).trim(), "job job");
}

#[test]
fn act_env_file_points_at_the_manifest_envfile() {
    let p = Project::new();
    p.file("m.env", "Y=1\n").actfile(
        r#"
version: "1"
envfile: m.env
acts:
  job:
    start: basename "$ACT_ENV_FILE"
"#,
    );
    assert_eq!(p.run_ok(&["run", "job"]).trim(), "m.env");
}

#[test]
fn parallel_runtime_dotenv_writes_do_not_crash() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  job:
    start:
      parallel: true
      cmds:
        - echo A=1 >> "$ACT_ENV"
        - echo B=2 >> "$ACT_ENV"
        - echo C=3 >> "$ACT_ENV"
"#,
    );
    // No ordering promise for concurrent writers; the run just completes.
    p.run_ok(&["run", "job"]);
}
