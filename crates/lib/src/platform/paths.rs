//! Filesystem layout for payloads and per-language build directories.
//!
//! ```text
//! <root>/
//!   payloads/            shared payload store
//!   build/<language>/    staging directory, one per language
//!   build/<language>.lock
//! ```

use std::path::{Path, PathBuf};

use crate::consts::{APP_NAME, ROOT_ENV};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  let userprofile = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
  PathBuf::from(userprofile)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
  PathBuf::from(home)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Resolve the builder root.
///
/// `BUILDER_ROOT` wins, then the configured root, then the data directory.
pub fn root_dir(configured: Option<&Path>) -> PathBuf {
  if let Ok(root) = std::env::var(ROOT_ENV)
    && !root.trim().is_empty()
  {
    return PathBuf::from(root);
  }
  configured.map(Path::to_path_buf).unwrap_or_else(data_dir)
}

/// Resolved directory layout rooted at a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  root: PathBuf,
}

impl Layout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn payloads_dir(&self) -> PathBuf {
    self.root.join("payloads")
  }

  pub fn build_root(&self) -> PathBuf {
    self.root.join("build")
  }

  pub fn build_dir(&self, language: &str) -> PathBuf {
    self.build_root().join(language)
  }

  /// Lock file for a language's staging directory. Lives beside the
  /// directory so the directory itself can be purged empty.
  pub fn build_lock_path(&self, language: &str) -> PathBuf {
    self.build_root().join(format!("{language}.lock"))
  }
}
