//! Implementation of the `builder build` command.
//!
//! Reads a task file of targets, builds every one carrying inline source and
//! optionally writes the updated targets (state, payloads, command) back out.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::info;

use builder_lib::engine::{BuildOutcome, code_hook_languages};
use builder_lib::target::BuildTarget;

use crate::output::{format_duration, print_error, print_info, print_stat, print_success, print_warning, symbols};

pub fn cmd_build(config: &Path, targets_file: &Path, output: Option<&Path>) -> Result<()> {
  let start = Instant::now();
  let config = super::load_config(config)?;
  let mut targets = load_targets(targets_file)?;

  let hooked = code_hook_languages(&targets);
  if hooked.is_empty() {
    print_info("No targets carry inline source, nothing to build.");
    return Ok(());
  }

  let builder = super::docker_builder(&config);
  let rt = super::runtime()?;

  let results = rt.block_on(async {
    let report = builder.provision().await;
    for (language, error) in report.failed.iter().filter(|(l, _)| hooked.contains(*l)) {
      print_warning(&format!("{} unavailable: {}", language, error));
    }
    builder.build_all(&mut targets).await
  });

  let mut errors = 0;
  let mut unbuilt = 0;
  for (id, result) in &results {
    match result {
      Ok(BuildOutcome::Built { payload }) => {
        print_success(&format!("{} {} {}", id, symbols::ARROW, payload.display()));
      }
      Ok(BuildOutcome::AlreadyBuilt) => print_info(&format!("{} already built", id)),
      Ok(BuildOutcome::EnvironmentMissing) => {
        unbuilt += 1;
        print_warning(&format!("{}: no build environment", id));
      }
      Ok(BuildOutcome::Failed { attempts }) => {
        unbuilt += 1;
        print_warning(&format!("{}: no artifact produced (attempt {})", id, attempts));
      }
      Ok(BuildOutcome::RetriesExhausted { attempts }) => {
        unbuilt += 1;
        print_warning(&format!("{}: gave up after {} attempt(s)", id, attempts));
      }
      Err(e) => {
        errors += 1;
        print_error(&format!("{}: {}", id, e));
      }
    }
  }

  if let Some(path) = output {
    write_targets(path, &targets)?;
    info!(path = %path.display(), "targets written");
  }

  println!();
  print_stat("Built", &(results.len() - unbuilt - errors).to_string());
  print_stat("Not built", &unbuilt.to_string());
  print_stat("Duration", &format_duration(start.elapsed()));

  if errors > 0 {
    bail!("{} build(s) failed with a container runtime error", errors);
  }
  Ok(())
}

/// JSON is valid YAML, so one parser covers both.
fn load_targets(path: &Path) -> Result<Vec<BuildTarget>> {
  let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  serde_yaml::from_str(&content).with_context(|| format!("Failed to parse targets in {}", path.display()))
}

fn write_targets(path: &Path, targets: &[BuildTarget]) -> Result<()> {
  let is_yaml = path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| e == "yml" || e == "yaml");
  let content = if is_yaml {
    serde_yaml::to_string(targets)?
  } else {
    serde_json::to_string_pretty(targets)?
  };
  std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
