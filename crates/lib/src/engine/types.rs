use std::path::PathBuf;

use thiserror::Error;

use crate::context::{LockError, StageError};
use crate::runtime::RuntimeError;

/// Errors that abort a build call. Configuration and toolchain problems are
/// reported through [`BuildOutcome`] instead.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("container runtime error: {0}")]
  Runtime(#[from] RuntimeError),

  #[error("staging error: {0}")]
  Stage(#[from] StageError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("build target {0:?} is not a plain file name")]
  InvalidBuildTarget(String),

  #[error("no build environment configured for {0}")]
  UnknownLanguage(String),
}

/// What a call to `ensure_built` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
  /// The target was already built; nothing ran.
  AlreadyBuilt,
  /// The artifact was produced and published.
  Built { payload: PathBuf },
  /// No usable environment for the target's language.
  EnvironmentMissing,
  /// The container ran but produced no artifact.
  Failed { attempts: u32 },
  /// Earlier attempts used up the retry budget; nothing ran.
  RetriesExhausted { attempts: u32 },
}

impl BuildOutcome {
  pub fn is_built(&self) -> bool {
    matches!(self, Self::AlreadyBuilt | Self::Built { .. })
  }
}

/// Bounds how many times a target whose build produced nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
}

impl RetryPolicy {
  /// At least one attempt is always allowed.
  pub fn new(max_attempts: u32) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
    }
  }

  pub fn allows(&self, attempts_so_far: u32) -> bool {
    attempts_so_far < self.max_attempts
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(3)
  }
}
