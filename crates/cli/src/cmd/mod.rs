mod build;
mod envs;
mod provision;

use std::path::Path;

use anyhow::{Context, Result};

use builder_lib::artifact::DirectoryArtifactStore;
use builder_lib::engine::Builder;
use builder_lib::environment::BuilderConfig;
use builder_lib::platform::paths::{Layout, root_dir};
use builder_lib::runtime::DockerCli;

pub use build::cmd_build;
pub use envs::cmd_envs;
pub use provision::cmd_provision;

fn load_config(path: &Path) -> Result<BuilderConfig> {
  BuilderConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}

/// A builder over the docker CLI, rooted where the config says.
fn docker_builder(config: &BuilderConfig) -> Builder<DockerCli, DirectoryArtifactStore> {
  let layout = Layout::new(root_dir(config.root.as_deref()));
  let artifacts = DirectoryArtifactStore::new([layout.payloads_dir()]);
  Builder::from_config(config, layout, DockerCli::from_env(), artifacts)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
