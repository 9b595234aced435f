//! Test utilities for builder-lib.
//!
//! [`FakeRuntime`] stands in for the container engine: it records every call
//! and, on `run`, writes configured files into the bind-mounted directory the
//! way a real toolchain would.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::runtime::{ContainerRuntime, ExitInfo, ExitStatus, RunSpec, RuntimeError};

#[derive(Debug, Default)]
pub struct FakeRuntime {
  local_images: Mutex<HashMap<String, String>>,
  unpullable: HashSet<String>,
  pulls: Mutex<Vec<String>>,
  quiet: AtomicBool,
  quiet_during_pull: Mutex<Option<bool>>,
  runs: Mutex<Vec<RunSpec>>,
  staged: Mutex<Vec<Vec<String>>>,
  outputs: Vec<(String, String)>,
  fail_runs: bool,
  timed_out: bool,
}

impl FakeRuntime {
  pub fn with_local_image(self, reference: &str, id: &str) -> Self {
    self
      .local_images
      .lock()
      .unwrap()
      .insert(reference.to_string(), id.to_string());
    self
  }

  pub fn with_unpullable(mut self, reference: &str) -> Self {
    self.unpullable.insert(reference.to_string());
    self
  }

  /// File the "toolchain" writes into the staging directory on each run.
  pub fn with_output(mut self, name: &str, content: &str) -> Self {
    self.outputs.push((name.to_string(), content.to_string()));
    self
  }

  /// Make `run` fail as if the container engine were unreachable.
  pub fn failing_runs(mut self) -> Self {
    self.fail_runs = true;
    self
  }

  /// Make `run` report a timeout after writing its outputs, as a toolchain
  /// killed mid-build would.
  pub fn timing_out(mut self) -> Self {
    self.timed_out = true;
    self
  }

  pub fn pulls(&self) -> Vec<String> {
    self.pulls.lock().unwrap().clone()
  }

  pub fn runs(&self) -> Vec<RunSpec> {
    self.runs.lock().unwrap().clone()
  }

  /// Sorted file names present in the mount when each run started.
  pub fn staged_files(&self) -> Vec<Vec<String>> {
    self.staged.lock().unwrap().clone()
  }

  pub fn is_quiet(&self) -> bool {
    self.quiet.load(Ordering::SeqCst)
  }

  pub fn quiet_during_pull(&self) -> Option<bool> {
    *self.quiet_during_pull.lock().unwrap()
  }
}

impl ContainerRuntime for FakeRuntime {
  async fn find_image(&self, reference: &str) -> Result<Option<String>, RuntimeError> {
    Ok(self.local_images.lock().unwrap().get(reference).cloned())
  }

  async fn pull_image(&self, reference: &str) -> Result<String, RuntimeError> {
    *self.quiet_during_pull.lock().unwrap() = Some(self.is_quiet());
    self.pulls.lock().unwrap().push(reference.to_string());
    if self.unpullable.contains(reference) {
      return Err(RuntimeError::CommandFailed {
        command: format!("docker pull {reference}"),
        code: Some(1),
        stderr: "manifest unknown".to_string(),
      });
    }
    let id = format!("sha256:pulled-{reference}");
    self
      .local_images
      .lock()
      .unwrap()
      .insert(reference.to_string(), id.clone());
    Ok(id)
  }

  async fn run(&self, spec: &RunSpec, _timeout: Option<Duration>) -> Result<ExitInfo, RuntimeError> {
    self.runs.lock().unwrap().push(spec.clone());

    let mut present: Vec<String> = std::fs::read_dir(&spec.host_dir)
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    present.sort();
    self.staged.lock().unwrap().push(present);

    if self.fail_runs {
      return Err(RuntimeError::Spawn {
        program: "docker".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "docker not found"),
      });
    }
    for (name, content) in &self.outputs {
      std::fs::write(spec.host_dir.join(name), content).unwrap();
    }
    if self.timed_out {
      return Ok(ExitInfo {
        status: ExitStatus::TimedOut,
        duration: Duration::from_secs(1),
      });
    }
    Ok(ExitInfo {
      status: ExitStatus::Exited(Some(0)),
      duration: Duration::from_millis(5),
    })
  }

  fn set_quiet(&self, quiet: bool) -> bool {
    self.quiet.swap(quiet, Ordering::SeqCst)
  }
}
