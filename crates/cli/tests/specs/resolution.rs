// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name resolution through nested acts, redirects, and includes.

use super::prelude::*;

#[test]
fn declaration_order_determines_the_match() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  foo-.+:
    start: echo generic
  foo-bar:
    start: echo specific
"#,
    );
    assert_eq!(p.run_ok(&["run", "foo-bar"]).trim(), "generic");
}

#[test]
fn reversing_declaration_order_flips_the_match() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  foo-bar:
    start: echo specific
  foo-.+:
    start: echo generic
"#,
    );
    assert_eq!(p.run_ok(&["run", "foo-bar"]).trim(), "specific");
}

#[test]
fn index_child_answers_the_bare_name() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  zoo:
    acts:
      _:
        start: echo X
      keeper:
        start: echo K
"#,
    );
    assert_eq!(p.run_ok(&["run", "zoo"]).trim(), "X");
    assert_eq!(p.run_ok(&["run", "zoo.keeper"]).trim(), "K");
}

#[test]
fn unmatched_child_fails_with_a_resolution_error() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  zoo:
    acts:
      keeper:
        start: echo K
"#,
    );
    let output = p.run(&["run", "zoo.other"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("not found"));
}

#[test]
fn redirect_preserves_the_segment_list() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  a:
    redirect: other/actfile.yml
"#,
    )
    .file(
        "other/actfile.yml",
        r#"
version: "1"
acts:
  a:
    start: echo A
"#,
    );
    assert_eq!(p.run_ok(&["run", "a"]).trim(), "A");
}

#[test]
fn include_consumes_one_segment() {
    let p = Project::new();
    p.actfile(
        r#"
version: "1"
acts:
  a:
    include: other/actfile.yml
"#,
    )
    .file(
        "other/actfile.yml",
        r#"
version: "1"
acts:
  b:
    start: echo B
"#,
    );
    assert_eq!(p.run_ok(&["run", "a.b"]).trim(), "B");

    // The bare name has no default child in the included manifest.
    let output = p.run(&["run", "a"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_act_reports_the_manifest_path() {
    let p = Project::new();
    p.actfile("version: \"1\"\nacts:\n  a:\n    start: echo a\n");
    let output = p.run(&["run", "missing"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr_str(&output);
    assert!(err.contains("act missing not found"));
    assert!(err.contains("actfile.yml"));
}

#[test]
fn missing_manifest_is_a_load_error() {
    let p = Project::new();
    let output = p.run(&["run", "anything"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("could not read actfile"));
}

#[test]
fn alternate_manifest_via_dash_f() {
    let p = Project::new();
    p.file(
        "ci.yml",
        r#"
version: "1"
acts:
  build:
    start: echo built
"#,
    );
    assert_eq!(p.run_ok(&["run", "-f", "ci.yml", "build"]).trim(), "built");
}
