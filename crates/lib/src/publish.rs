//! Moving build output into the shared payload store.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::consts::{EXEC_WRAPPER_EXT, RAW_SHELLCODE_EXT};

/// Name a payload is stored under. Raw shellcode gets an executable
/// wrapper extension so agents can launch it.
pub fn destination_name(artifact: &str) -> String {
  if artifact.ends_with(RAW_SHELLCODE_EXT) {
    format!("{artifact}{EXEC_WRAPPER_EXT}")
  } else {
    artifact.to_string()
  }
}

/// Move `artifact` from `build_dir` into `payloads_dir`.
///
/// Any existing payload with the destination name is removed first. Returns
/// `None` without touching the store when the build produced nothing.
pub async fn publish(build_dir: &Path, payloads_dir: &Path, artifact: &str) -> io::Result<Option<PathBuf>> {
  let src = build_dir.join(artifact);
  if !fs::try_exists(&src).await? {
    debug!(artifact = %artifact, "no artifact produced, nothing to publish");
    return Ok(None);
  }

  fs::create_dir_all(payloads_dir).await?;
  let dst = payloads_dir.join(destination_name(artifact));
  if fs::metadata(&dst).await.is_ok_and(|m| m.is_file()) {
    fs::remove_file(&dst).await?;
  }

  move_file(&src, &dst).await?;
  info!(artifact = %artifact, path = %dst.display(), "published payload");
  Ok(Some(dst))
}

/// Rename, falling back to copy and remove across filesystems.
async fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
  match fs::rename(src, dst).await {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
      fs::copy(src, dst).await?;
      fs::remove_file(src).await
    }
    Err(e) => Err(e),
  }
}
