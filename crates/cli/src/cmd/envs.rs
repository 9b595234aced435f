//! Implementation of the `builder envs` command.

use std::path::Path;

use anyhow::Result;

use crate::output::{print_info, print_json, print_stat};

/// List enabled environments, or print the enabled mapping as JSON.
pub fn cmd_envs(config: &Path, json: bool) -> Result<()> {
  let config = super::load_config(config)?;

  if json {
    return print_json(&config.enabled);
  }

  if config.enabled.is_empty() {
    print_info("No build environments enabled.");
    return Ok(());
  }

  for (language, env) in &config.enabled {
    print_info(&format!("{} ({})", language, env.family_for(language)));
    print_stat("Image", &env.image);
    print_stat("Workdir", &env.working_dir);
    print_stat("Source", &env.source_file());
    print_stat("Command", &env.command_template);
    if let Some(entrypoint) = &env.entrypoint {
      print_stat("Entrypoint", entrypoint);
    }
  }

  if let Some(timeout) = config.timeout {
    println!();
    print_stat("Timeout", &humantime::format_duration(timeout).to_string());
  }

  Ok(())
}
