//! End-to-end tests for the `ynl-dispatch` binary using the dry-run family.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const NETDEV: &str = r#"
name: netdev
attribute-sets:
  - name: dev
    attributes:
      - name: ifindex
operations:
  list:
    - name: dev-get
      attribute-set: dev
      do:
        request:
          attributes: [ifindex]
      dump:
        reply:
          attributes: [ifindex]
    - name: dev-add-ntf
      notify: dev-get
      mcgrp: mgmt
mcast-groups:
  list:
    - name: mgmt
"#;

fn specs_dir(root: &Path) -> PathBuf {
    let specs = root.join("specs");
    fs::create_dir(&specs).unwrap();
    fs::write(specs.join("netdev.yaml"), NETDEV).unwrap();
    specs
}

fn write_config(root: &Path, doc: &serde_json::Value) -> PathBuf {
    let path = root.join("config.json");
    fs::write(&path, doc.to_string()).unwrap();
    path
}

#[test]
fn batch_reports_every_entry_and_exits_zero() {
    let dir = TempDir::new().unwrap();
    let specs = specs_dir(dir.path());
    let config = write_config(
        dir.path(),
        &serde_json::json!({
            "yaml-specs-path": specs,
            "spec-args": {
                "netdev.yaml": {
                    "do": "dev-get",
                    "subscribe": "mgmt",
                    "json-params": {"ifindex": 1}
                },
                "missing.yaml": {"do": "dev-get"},
                "dump-it": {"spec": "netdev.yaml", "dump": "dev-get"}
            }
        }),
    );

    let mut command = cargo_bin_cmd!("ynl-dispatch");
    command.arg("--config").arg(&config);
    command
        .assert()
        .success()
        .stdout(contains("############### netdev.yaml ###############"))
        .stdout(contains("############### missing.yaml ###############"))
        .stdout(contains("############### dump-it ###############"))
        .stdout(contains(r#""name": "dev-add-ntf""#))
        .stdout(contains(r#""kind": "dump""#))
        .stderr(contains("entry 'missing.yaml': no specification file 'missing.yaml'"));
}

#[test]
fn invalid_batch_document_fails_before_running() {
    let dir = TempDir::new().unwrap();
    let specs = specs_dir(dir.path());
    let config = write_config(
        dir.path(),
        &serde_json::json!({"yaml-specs-path": specs, "spec-args": ["netdev.yaml"]}),
    );

    let mut command = cargo_bin_cmd!("ynl-dispatch");
    command.arg("--config").arg(&config);
    command
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("$.spec-args: expected object, found array"));
}

#[test]
fn fatal_error_is_reported_once() {
    let dir = TempDir::new().unwrap();
    let specs = specs_dir(dir.path());
    let config = write_config(
        dir.path(),
        &serde_json::json!({"yaml-specs-path": specs, "spec-args": ["netdev.yaml"]}),
    );

    let mut command = cargo_bin_cmd!("ynl-dispatch");
    let output = command.arg("--config").arg(&config).output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.matches("expected object, found array").count(), 1);
    assert_eq!(stderr.lines().count(), 1);
    assert!(stderr.starts_with("error: configuration file "));
}

#[test]
fn missing_batch_config_fails() {
    let dir = TempDir::new().unwrap();

    let mut command = cargo_bin_cmd!("ynl-dispatch");
    command.arg("--config").arg(dir.path().join("absent.json"));
    command
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}

#[test]
fn missing_spec_directory_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &serde_json::json!({"yaml-specs-path": dir.path().join("nowhere")}),
    );

    let mut command = cargo_bin_cmd!("ynl-dispatch");
    command.arg("--config").arg(&config);
    command
        .assert()
        .failure()
        .stderr(contains("specification directory"));
}

#[test]
fn single_shot_prints_the_reply() {
    let dir = TempDir::new().unwrap();
    let specs = specs_dir(dir.path());

    let mut command = cargo_bin_cmd!("ynl-dispatch");
    command
        .arg("--spec")
        .arg(specs.join("netdev.yaml"))
        .args(["--do", "dev-get", "--json", r#"{"ifindex": 7}"#]);
    command
        .assert()
        .success()
        .stdout(contains(r#""operation": "dev-get""#))
        .stdout(contains(r#""ifindex": 7"#));
}

#[test]
fn single_shot_failure_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let specs = specs_dir(dir.path());

    let mut command = cargo_bin_cmd!("ynl-dispatch");
    command
        .arg("--spec")
        .arg(specs.join("netdev.yaml"))
        .args(["--do", "dev-set"]);
    command
        .assert()
        .failure()
        .stderr(contains("unknown operation 'dev-set'"));
}
