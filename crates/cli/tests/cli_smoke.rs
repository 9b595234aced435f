//! CLI smoke tests for builder.
//!
//! These run the binary against temporary configs. None of them need a
//! container engine: they stop before anything would be pulled or run.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn builder_cmd() -> Command {
  cargo_bin_cmd!("builder")
}

/// Create a temp directory holding `builder.yml`.
fn temp_config(content: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("builder.yml"), content).unwrap();
  temp
}

const CONFIG: &str = r#"
timeout: 5m
enabled:
  csharp:
    docker: mcr.microsoft.com/dotnet/sdk:8.0
    workdir: /build
    extension: cs
    build_command: csc -out:{build_target} {references} {code}
  go_windows:
    docker: golang:1.22
    workdir: /go/src
    extension: go
    build_command: "{modules} go build -o {build_target} {code}"
"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  builder_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"))
    .stdout(predicate::str::contains("provision"));
}

#[test]
fn version_flag_works() {
  builder_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("builder"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["envs", "provision", "build"] {
    builder_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// envs
// =============================================================================

#[test]
fn envs_lists_languages() {
  let temp = temp_config(CONFIG);

  builder_cmd()
    .arg("--config")
    .arg(temp.path().join("builder.yml"))
    .arg("envs")
    .assert()
    .success()
    .stdout(predicate::str::contains("csharp (dotnet)"))
    .stdout(predicate::str::contains("go_windows (go)"))
    .stdout(predicate::str::contains("code.cs"));
}

#[test]
fn envs_json_prints_enabled_mapping() {
  let temp = temp_config(CONFIG);

  let output = builder_cmd()
    .arg("--config")
    .arg(temp.path().join("builder.yml"))
    .args(["envs", "--json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["csharp"]["docker"], "mcr.microsoft.com/dotnet/sdk:8.0");
  assert_eq!(json["go_windows"]["workdir"], "/go/src");
}

#[test]
fn missing_config_fails() {
  let temp = TempDir::new().unwrap();

  builder_cmd()
    .arg("--config")
    .arg(temp.path().join("absent.yml"))
    .arg("envs")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn empty_field_is_rejected() {
  let temp = temp_config("enabled:\n  nim:\n    docker: ''\n    workdir: /b\n    build_command: nim c {code}\n");

  builder_cmd()
    .arg("--config")
    .arg(temp.path().join("builder.yml"))
    .arg("envs")
    .assert()
    .failure()
    .stderr(predicate::str::contains("empty docker"));
}

// =============================================================================
// build
// =============================================================================

#[test]
fn build_without_inline_source_is_noop() {
  let temp = temp_config(CONFIG);
  let targets = temp.path().join("targets.yml");
  std::fs::write(&targets, "- id: a1\n  language: csharp\n  build_target: a.exe\n").unwrap();

  builder_cmd()
    .arg("--config")
    .arg(temp.path().join("builder.yml"))
    .arg("build")
    .arg(&targets)
    .env("BUILDER_ROOT", temp.path().join("root"))
    .assert()
    .success()
    .stdout(predicate::str::contains("nothing to build"));
}

#[test]
fn build_with_unreadable_targets_fails() {
  let temp = temp_config(CONFIG);

  builder_cmd()
    .arg("--config")
    .arg(temp.path().join("builder.yml"))
    .arg("build")
    .arg(temp.path().join("missing.yml"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read"));
}
