//! Container runtime used to provision images and run builds.
//!
//! [`ContainerRuntime`] is the seam between the pipeline and the container
//! engine. [`DockerCli`] drives the `docker` binary; tests substitute a fake.

mod docker;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::template::CommandLine;

pub use docker::{DockerCli, RUNTIME_ENV};

#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("`{command}` failed with exit code {code:?}: {stderr}")]
  CommandFailed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("image {0} not present after pull")]
  ImageMissing(String),
}

/// One container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
  /// Image id (or reference) to start from.
  pub image: String,
  /// Container name, used to kill it on timeout.
  pub name: String,
  pub working_dir: String,
  /// Host directory bind-mounted read-write at `working_dir`.
  pub host_dir: PathBuf,
  pub command: CommandLine,
  /// `uid:gid` for the container process.
  pub user: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
  Exited(Option<i32>),
  TimedOut,
}

#[derive(Debug, Clone)]
pub struct ExitInfo {
  pub status: ExitStatus,
  pub duration: Duration,
}

pub trait ContainerRuntime: Send + Sync {
  /// Id of a locally cached image matching `reference`, if any.
  fn find_image(&self, reference: &str) -> impl Future<Output = Result<Option<String>, RuntimeError>> + Send;

  /// Pull `reference` and return the resulting image id.
  fn pull_image(&self, reference: &str) -> impl Future<Output = Result<String, RuntimeError>> + Send;

  /// Run a disposable container and wait for it to exit.
  fn run(
    &self,
    spec: &RunSpec,
    timeout: Option<Duration>,
  ) -> impl Future<Output = Result<ExitInfo, RuntimeError>> + Send;

  /// Switch transport chatter on or off. Returns the previous setting.
  fn set_quiet(&self, _quiet: bool) -> bool {
    false
  }
}

/// Keeps a runtime quiet for as long as it is held.
pub struct QuietGuard<'a, R: ContainerRuntime + ?Sized> {
  runtime: &'a R,
  previous: bool,
}

impl<'a, R: ContainerRuntime + ?Sized> QuietGuard<'a, R> {
  pub fn new(runtime: &'a R) -> Self {
    let previous = runtime.set_quiet(true);
    Self { runtime, previous }
  }
}

impl<R: ContainerRuntime + ?Sized> Drop for QuietGuard<'_, R> {
  fn drop(&mut self) {
    self.runtime.set_quiet(self.previous);
  }
}
