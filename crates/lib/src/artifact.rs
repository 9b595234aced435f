//! Lookup of dependency artifacts staged alongside the source.

use std::collections::HashMap;
use std::path::PathBuf;

use uuid::Uuid;

/// Locates pre-existing artifacts by name or opaque identifier.
pub trait ArtifactStore: Send + Sync {
  /// Path of the artifact called `name`, if the store holds it.
  fn find_artifact_path(&self, name: &str) -> Option<PathBuf>;

  /// Name registered for an opaque identifier.
  fn resolve_name_from_identifier(&self, id: &str) -> Option<String>;
}

/// Whether a payload entry is a v4 UUID rather than a file name.
pub fn is_uuid4(value: &str) -> bool {
  Uuid::parse_str(value).is_ok_and(|id| id.get_version_num() == 4)
}

/// Resolve a payload entry to a file name, following identifiers.
pub fn resolve_name(store: &impl ArtifactStore, entry: &str) -> Option<String> {
  if is_uuid4(entry) {
    store.resolve_name_from_identifier(entry)
  } else {
    Some(entry.to_string())
  }
}

/// Searches an ordered list of directories; the first hit wins.
#[derive(Debug, Clone, Default)]
pub struct DirectoryArtifactStore {
  search_dirs: Vec<PathBuf>,
  identifiers: HashMap<String, String>,
}

impl DirectoryArtifactStore {
  pub fn new(search_dirs: impl IntoIterator<Item = PathBuf>) -> Self {
    Self {
      search_dirs: search_dirs.into_iter().collect(),
      identifiers: HashMap::new(),
    }
  }

  /// Map an identifier to the artifact name it stands for.
  pub fn with_identifier(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
    self.identifiers.insert(id.into(), name.into());
    self
  }
}

impl ArtifactStore for DirectoryArtifactStore {
  fn find_artifact_path(&self, name: &str) -> Option<PathBuf> {
    self.search_dirs.iter().map(|dir| dir.join(name)).find(|path| path.is_file())
  }

  fn resolve_name_from_identifier(&self, id: &str) -> Option<String> {
    self.identifiers.get(id).cloned()
  }
}
