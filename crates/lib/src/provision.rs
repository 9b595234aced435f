//! Making sure each language's build image is available locally.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::runtime::{ContainerRuntime, QuietGuard, RuntimeError};

/// A resolved local image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageHandle {
  pub reference: String,
  pub id: String,
}

impl ImageHandle {
  /// Abbreviated id for display, `sha256:` prefix dropped.
  pub fn short_id(&self) -> &str {
    let id = self.id.strip_prefix("sha256:").unwrap_or(&self.id);
    id.get(..12).unwrap_or(id)
  }
}

impl fmt::Display for ImageHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.reference, self.short_id())
  }
}

/// Use the cached image if present, pull it otherwise.
///
/// Transport output stays quiet for the duration of the call.
pub async fn provision_image<R: ContainerRuntime>(runtime: &R, reference: &str) -> Result<ImageHandle, RuntimeError> {
  let _quiet = QuietGuard::new(runtime);

  let id = match runtime.find_image(reference).await? {
    Some(id) => {
      debug!(image = %reference, id = %id, "image already present");
      id
    }
    None => runtime.pull_image(reference).await?,
  };
  Ok(ImageHandle {
    reference: reference.to_string(),
    id,
  })
}

/// Pull `reference` even if a local copy exists, picking up a newer image.
pub async fn refresh_image<R: ContainerRuntime>(runtime: &R, reference: &str) -> Result<ImageHandle, RuntimeError> {
  let _quiet = QuietGuard::new(runtime);

  let id = runtime.pull_image(reference).await?;
  info!(image = %reference, id = %id, "image refreshed");
  Ok(ImageHandle {
    reference: reference.to_string(),
    id,
  })
}

/// Result of provisioning every enabled language.
#[derive(Debug, Default)]
pub struct ProvisionReport {
  pub ready: BTreeMap<String, ImageHandle>,
  pub failed: BTreeMap<String, String>,
}

impl ProvisionReport {
  pub fn is_complete(&self) -> bool {
    self.failed.is_empty()
  }
}
