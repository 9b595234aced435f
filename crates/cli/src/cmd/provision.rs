//! Implementation of the `builder provision` command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Result, bail};

use crate::output::{format_duration, print_error, print_stat, print_success, symbols};

pub fn cmd_provision(config: &Path, refresh: bool) -> Result<()> {
  let start = Instant::now();
  let config = super::load_config(config)?;
  let builder = super::docker_builder(&config);
  let rt = super::runtime()?;

  let report = if refresh {
    rt.block_on(builder.refresh())
  } else {
    rt.block_on(builder.provision())
  };

  for (language, handle) in &report.ready {
    print_success(&format!("{} {} {}", language, symbols::ARROW, handle));
  }
  for (language, error) in &report.failed {
    print_error(&format!("{}: {}", language, error));
  }
  println!();
  print_stat("Ready", &report.ready.len().to_string());
  print_stat("Duration", &format_duration(start.elapsed()));

  if !report.is_complete() {
    bail!("{} environment(s) could not be provisioned", report.failed.len());
  }
  Ok(())
}
