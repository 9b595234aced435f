//! Build targets: the per-task unit submitted for compilation.
//!
//! Targets are owned by the task registry. The engine only touches
//! `command`, `payloads`, `state` and `status`.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// Where a target sits in its build lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BuildStatus {
  #[default]
  Unbuilt,
  Built,
  /// The container ran but produced no artifact.
  Failed { attempts: u32 },
}

/// Flags kept alongside the target, mirroring the registry's own fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalState {
  #[serde(default)]
  pub built: bool,
  /// A missing-environment error was already reported for this target.
  #[serde(default)]
  pub build_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
  /// Identifier used in logs, typically the ability id.
  pub id: String,
  pub language: String,
  #[serde(default)]
  pub platform: String,
  /// Inline source; targets without it are never hooked.
  #[serde(default)]
  pub code: Option<String>,
  pub build_target: String,
  /// Payload list: shipped artifacts plus build-time dependencies.
  #[serde(default)]
  pub payloads: Vec<String>,
  /// Invocation command, synthesized after a successful build if unset.
  #[serde(default)]
  pub command: Option<String>,
  #[serde(default)]
  pub state: AdditionalState,
  #[serde(default)]
  pub status: BuildStatus,
}

impl BuildTarget {
  pub fn new(
    id: impl Into<String>,
    language: impl Into<String>,
    code: impl Into<String>,
    build_target: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      language: language.into(),
      platform: String::new(),
      code: Some(code.into()),
      build_target: build_target.into(),
      payloads: Vec::new(),
      command: None,
      state: AdditionalState::default(),
      status: BuildStatus::Unbuilt,
    }
  }

  pub fn has_code(&self) -> bool {
    self.code.as_deref().is_some_and(|c| !c.is_empty())
  }

  pub fn is_built(&self) -> bool {
    self.state.built
  }

  pub fn attempts(&self) -> u32 {
    match self.status {
      BuildStatus::Failed { attempts } => attempts,
      _ => 0,
    }
  }
}

/// Whether `name` is a single plain file name. Anything else (empty,
/// absolute, `..`, separators) would resolve outside the staging directory
/// or the payload store once joined onto them.
pub fn is_plain_file_name(name: &str) -> bool {
  if name.contains(['/', '\\']) {
    return false;
  }
  let mut components = Path::new(name).components();
  matches!(
    (components.next(), components.next()),
    (Some(Component::Normal(_)), None)
  )
}

/// Relative-path invocation of a compiled payload.
pub fn invocation_command(build_target: &str) -> String {
  format!(".\\{build_target}")
}
