// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! End-to-end CLI checks against a scratch project directory

use assert_cmd::Command;
use predicates::prelude::*;

const VALID_PIPELINE: &str = r#"
version: "1"
name: "cli-demo"
stages:
  - name: "Source"
    actions:
      - name: "checkout"
        kind:
          type: checkout
          repository: "demo-repo"
        outputs: [src]
  - name: "Build"
    actions:
      - name: "build"
        kind:
          type: build
        inputs: [src]
        outputs: [bin]
"#;

const BROKEN_PIPELINE: &str = r#"
version: "1"
name: "cli-broken"
stages:
  - name: "Source"
    actions:
      - name: "checkout"
        kind:
          type: checkout
          repository: "demo-repo"
        outputs: [src]
  - name: "Build"
    actions:
      - name: "build"
        kind:
          type: build
        inputs: [bin2]
        outputs: [bin]
"#;

fn write_pipeline(dir: &tempfile::TempDir, content: &str) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.path().join(".shipflow.yaml");
    std::fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn validate_accepts_a_wired_pipeline() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_pipeline(&dir, VALID_PIPELINE)?;

    Command::cargo_bin("shipflow")?
        .current_dir(dir.path())
        .args(["validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline is valid"));

    Ok(())
}

#[test]
fn validate_rejects_a_missing_input() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_pipeline(&dir, BROKEN_PIPELINE)?;

    Command::cargo_bin("shipflow")?
        .current_dir(dir.path())
        .args(["validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("bin2"));

    Ok(())
}

#[test]
fn graph_renders_artifact_edges() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_pipeline(&dir, VALID_PIPELINE)?;

    Command::cargo_bin("shipflow")?
        .current_dir(dir.path())
        .args(["graph", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"Source/checkout\" -> \"Build/build\" [label=\"src\"]",
        ));

    Ok(())
}

#[test]
fn run_auto_approve_completes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_pipeline(&dir, VALID_PIPELINE)?;

    Command::cargo_bin("shipflow")?
        .current_dir(dir.path())
        .args(["run", "--auto-approve"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline completed successfully"));

    Ok(())
}

#[test]
fn init_writes_a_buildable_definition() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    Command::cargo_bin("shipflow")?
        .current_dir(dir.path())
        .args(["init", "demo"])
        .assert()
        .success();

    Command::cargo_bin("shipflow")?
        .current_dir(dir.path())
        .args(["validate"])
        .assert()
        .success();

    Ok(())
}
