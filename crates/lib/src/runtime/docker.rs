//! `docker` CLI runtime.

use std::ffi::OsString;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, trace, warn};

use super::{ContainerRuntime, ExitInfo, ExitStatus, RunSpec, RuntimeError};
use crate::template::CommandLine;

/// Environment variable naming the container CLI binary (default `docker`).
pub const RUNTIME_ENV: &str = "BUILDER_CONTAINER_RUNTIME";

#[derive(Debug)]
pub struct DockerCli {
  binary: String,
  quiet: AtomicBool,
}

impl Default for DockerCli {
  fn default() -> Self {
    Self::new("docker")
  }
}

impl DockerCli {
  pub fn new(binary: impl Into<String>) -> Self {
    Self {
      binary: binary.into(),
      quiet: AtomicBool::new(false),
    }
  }

  /// Honour `BUILDER_CONTAINER_RUNTIME` (e.g. `podman`).
  pub fn from_env() -> Self {
    match std::env::var(RUNTIME_ENV) {
      Ok(binary) if !binary.trim().is_empty() => Self::new(binary.trim()),
      _ => Self::default(),
    }
  }

  pub fn binary(&self) -> &str {
    &self.binary
  }

  fn is_quiet(&self) -> bool {
    self.quiet.load(Ordering::SeqCst)
  }

  /// Run a short-lived CLI command and return its stdout.
  async fn capture(&self, args: &[&str]) -> Result<String, RuntimeError> {
    let output = Command::new(&self.binary)
      .args(args)
      .stdin(Stdio::null())
      .output()
      .await
      .map_err(|source| RuntimeError::Spawn {
        program: self.binary.clone(),
        source,
      })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !self.is_quiet() {
      for line in stdout.lines() {
        trace!(target: "builder::transport", "{line}");
      }
    }

    if !output.status.success() {
      return Err(RuntimeError::CommandFailed {
        command: format!("{} {}", self.binary, args.join(" ")),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    Ok(stdout)
  }

  async fn kill(&self, name: &str) {
    if let Err(e) = self.capture(&["kill", name]).await {
      warn!(container = %name, error = %e, "failed to kill timed out container");
    }
  }
}

/// Arguments for `docker run`, in order.
pub(crate) fn run_args(spec: &RunSpec) -> Vec<OsString> {
  let mut args: Vec<OsString> = vec!["run".into(), "--rm".into(), "--name".into(), spec.name.clone().into()];

  args.push("--workdir".into());
  args.push(spec.working_dir.clone().into());

  let mut mount = OsString::from("type=bind,source=");
  mount.push(spec.host_dir.as_os_str());
  mount.push(format!(",target={},readonly=false", spec.working_dir));
  args.push("--mount".into());
  args.push(mount);

  if let Some(user) = &spec.user {
    args.push("--user".into());
    args.push(user.clone().into());
  }

  // Options must precede the image; everything after it is the command.
  args.push("--entrypoint".into());
  args.push("".into());
  args.push(spec.image.clone().into());

  match &spec.command {
    CommandLine::Argv(argv) => args.extend(argv.iter().map(OsString::from)),
    CommandLine::Shell(script) => {
      args.push("/bin/sh".into());
      args.push("-c".into());
      args.push(script.clone().into());
    }
  }
  args
}

impl ContainerRuntime for DockerCli {
  async fn find_image(&self, reference: &str) -> Result<Option<String>, RuntimeError> {
    let stdout = self.capture(&["images", "--quiet", "--no-trunc", reference]).await?;
    Ok(stdout.lines().map(str::trim).find(|l| !l.is_empty()).map(str::to_string))
  }

  async fn pull_image(&self, reference: &str) -> Result<String, RuntimeError> {
    info!(image = %reference, "pulling image");
    if self.is_quiet() {
      self.capture(&["pull", "--quiet", reference]).await?;
    } else {
      self.capture(&["pull", reference]).await?;
    }
    self
      .find_image(reference)
      .await?
      .ok_or_else(|| RuntimeError::ImageMissing(reference.to_string()))
  }

  async fn run(&self, spec: &RunSpec, timeout: Option<Duration>) -> Result<ExitInfo, RuntimeError> {
    let args = run_args(spec);
    debug!(container = %spec.name, image = %spec.image, ?args, "starting build container");

    let started = Instant::now();
    let child = Command::new(&self.binary)
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| RuntimeError::Spawn {
        program: self.binary.clone(),
        source,
      })?;

    let waited = match timeout {
      Some(limit) => tokio::time::timeout(limit, child.wait_with_output()).await.ok(),
      None => Some(child.wait_with_output().await),
    };

    let Some(output) = waited else {
      warn!(container = %spec.name, ?timeout, "build container timed out, killing");
      self.kill(&spec.name).await;
      return Ok(ExitInfo {
        status: ExitStatus::TimedOut,
        duration: started.elapsed(),
      });
    };
    let output = output.map_err(|source| RuntimeError::Spawn {
      program: self.binary.clone(),
      source,
    })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
      debug!(container = %spec.name, "{line}");
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
      debug!(container = %spec.name, stream = "stderr", "{line}");
    }

    // 125 is the CLI's own failure (daemon down, bad image), not the toolchain's.
    if output.status.code() == Some(125) {
      return Err(RuntimeError::CommandFailed {
        command: format!("{} run {}", self.binary, spec.image),
        code: Some(125),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    Ok(ExitInfo {
      status: ExitStatus::Exited(output.status.code()),
      duration: started.elapsed(),
    })
  }

  fn set_quiet(&self, quiet: bool) -> bool {
    self.quiet.swap(quiet, Ordering::SeqCst)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use std::path::PathBuf;

  fn spec(command: CommandLine) -> RunSpec {
    RunSpec {
      image: "sha256:abc".to_string(),
      name: "builder-csharp-1".to_string(),
      working_dir: "/build".to_string(),
      host_dir: PathBuf::from("/srv/builder/build/csharp"),
      command,
      user: Some("1000:1000".to_string()),
    }
  }

  fn strings(args: Vec<OsString>) -> Vec<String> {
    args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect()
  }

  #[test]
  fn run_args_mount_workdir_and_user() {
    let args = strings(run_args(&spec(CommandLine::Argv(vec!["csc".to_string()]))));

    assert_eq!(&args[..4], ["run", "--rm", "--name", "builder-csharp-1"]);
    assert!(args.contains(&"type=bind,source=/srv/builder/build/csharp,target=/build,readonly=false".to_string()));
    let workdir = args.iter().position(|a| a == "--workdir").unwrap();
    assert_eq!(args[workdir + 1], "/build");
    let user = args.iter().position(|a| a == "--user").unwrap();
    assert_eq!(args[user + 1], "1000:1000");
  }

  #[test]
  fn run_args_place_command_after_image() {
    let argv = vec!["csc".to_string(), "-out:a.exe".to_string(), "code.cs".to_string()];
    let args = strings(run_args(&spec(CommandLine::Argv(argv))));

    let entry = args.iter().position(|a| a == "--entrypoint").unwrap();
    assert_eq!(args[entry + 1], "");
    assert_eq!(args[entry + 2], "sha256:abc");
    assert_eq!(&args[entry + 3..], ["csc", "-out:a.exe", "code.cs"]);
  }

  #[test]
  fn run_args_wrap_shell_commands() {
    let args = strings(run_args(&spec(CommandLine::Shell("a && b".to_string()))));
    assert_eq!(&args[args.len() - 3..], ["/bin/sh", "-c", "a && b"]);
  }

  #[test]
  fn run_args_omit_user_when_unknown() {
    let mut spec = spec(CommandLine::Argv(vec![]));
    spec.user = None;
    assert!(!strings(run_args(&spec)).contains(&"--user".to_string()));
  }

  #[test]
  #[serial]
  fn from_env_honours_override() {
    temp_env::with_var(RUNTIME_ENV, Some("podman"), || {
      assert_eq!(DockerCli::from_env().binary(), "podman");
    });
    temp_env::with_var(RUNTIME_ENV, None::<&str>, || {
      assert_eq!(DockerCli::from_env().binary(), "docker");
    });
  }

  #[tokio::test]
  async fn missing_binary_is_a_spawn_error() {
    let cli = DockerCli::new("/nonexistent/docker-binary");
    let err = cli.find_image("alpine").await.unwrap_err();
    assert!(matches!(err, RuntimeError::Spawn { .. }));
  }
}
