mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{cmd_build, cmd_envs, cmd_provision};

/// Compile payloads from source inside disposable containers
#[derive(Parser)]
#[command(name = "builder")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the environments file
  #[arg(short, long, global = true, default_value = "builder.yml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List the enabled build environments
  Envs {
    /// Print the enabled mapping as JSON
    #[arg(long)]
    json: bool,
  },

  /// Make sure every environment's image is available locally
  Provision {
    /// Pull images even when a local copy exists
    #[arg(long)]
    refresh: bool,
  },

  /// Build every target in a task file that carries inline source
  Build {
    /// YAML or JSON list of targets
    targets: PathBuf,

    /// Write the updated targets to this file (YAML for .yml/.yaml, JSON otherwise)
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Envs { json } => cmd_envs(&cli.config, json),
    Commands::Provision { refresh } => cmd_provision(&cli.config, refresh),
    Commands::Build { targets, output } => cmd_build(&cli.config, &targets, output.as_deref()),
  }
}
