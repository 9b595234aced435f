//! Per-language staging directories.
//!
//! Each language owns one directory that is bind-mounted into its build
//! container. It is purged before and after every build so nothing leaks
//! from one build into the next.

pub mod lock;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::artifact::{ArtifactStore, resolve_name};
use crate::environment::{BuildEnvironment, LanguageFamily};
use crate::target::BuildTarget;

pub use lock::{LockError, StagingLock};

#[derive(Debug, Error)]
pub enum StageError {
  #[error("failed to write source {path}: {source}")]
  WriteSource {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to copy dependency {name} from {from}: {source}")]
  CopyDependency {
    name: String,
    from: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to purge {path}: {source}")]
  Purge {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// What ended up in the staging directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Staged {
  pub source_file: String,
  /// Dependency file names, in declared order.
  pub dependencies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuildContext {
  language: String,
  dir: PathBuf,
}

impl BuildContext {
  pub fn new(language: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
    Self {
      language: language.into(),
      dir: dir.into(),
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn language(&self) -> &str {
    &self.language
  }

  /// Create the directory if it is missing.
  pub async fn ensure(&self) -> std::io::Result<()> {
    if fs::try_exists(&self.dir).await? {
      debug!(language = %self.language, "build directory already constructed");
      return Ok(());
    }
    fs::create_dir_all(&self.dir).await
  }

  /// Number of files anywhere under the directory.
  pub fn file_count(&self) -> usize {
    WalkDir::new(&self.dir)
      .min_depth(1)
      .into_iter()
      .filter_map(|e| e.ok())
      .filter(|e| !e.file_type().is_dir())
      .count()
  }

  pub fn is_empty(&self) -> bool {
    self.file_count() == 0
  }

  /// Remove every file and subdirectory, keeping the directory itself.
  pub async fn purge(&self) -> Result<usize, StageError> {
    let purge_err = |path: &Path| {
      let path = path.to_path_buf();
      move |source| StageError::Purge { path, source }
    };

    if !fs::try_exists(&self.dir).await.map_err(purge_err(&self.dir))? {
      return Ok(0);
    }

    let mut removed = 0;
    let mut entries = fs::read_dir(&self.dir).await.map_err(purge_err(&self.dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(purge_err(&self.dir))? {
      let path = entry.path();
      let file_type = entry.file_type().await.map_err(purge_err(&path))?;
      if file_type.is_dir() {
        fs::remove_dir_all(&path).await.map_err(purge_err(&path))?;
      } else {
        fs::remove_file(&path).await.map_err(purge_err(&path))?;
      }
      removed += 1;
    }

    if removed > 0 {
      debug!(language = %self.language, removed, "purged build directory");
    }
    Ok(removed)
  }

  /// Write the source and copy in the target's dependency artifacts.
  pub async fn stage(
    &self,
    env: &BuildEnvironment,
    family: LanguageFamily,
    target: &BuildTarget,
    store: &impl ArtifactStore,
  ) -> Result<Staged, StageError> {
    let source_file = env.source_file();
    let source_path = self.dir.join(&source_file);
    fs::write(&source_path, target.code.as_deref().unwrap_or_default())
      .await
      .map_err(|source| StageError::WriteSource {
        path: source_path.clone(),
        source,
      })?;

    let mut dependencies = Vec::new();
    for entry in target.payloads.iter().filter(|p| family.is_dependency(p) || is_identifier(p)) {
      let Some(name) = resolve_name(store, entry) else {
        warn!(target = %target.id, entry = %entry, "unknown artifact identifier, skipping");
        continue;
      };
      if !family.is_dependency(&name) {
        continue;
      }
      let Some(from) = store.find_artifact_path(&name) else {
        warn!(target = %target.id, artifact = %name, "dependency artifact not found, skipping");
        continue;
      };

      fs::copy(&from, self.dir.join(&name))
        .await
        .map_err(|source| StageError::CopyDependency {
          name: name.clone(),
          from: from.clone(),
          source,
        })?;
      debug!(target = %target.id, artifact = %name, "staged dependency");
      dependencies.push(name);
    }

    Ok(Staged {
      source_file,
      dependencies,
    })
  }
}

fn is_identifier(entry: &str) -> bool {
  crate::artifact::is_uuid4(entry)
}
