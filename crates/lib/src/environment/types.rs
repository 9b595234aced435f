use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Language families that share dependency and diagnostics handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageFamily {
  /// C#/.NET compilers: `.dll` references, SARIF diagnostics.
  Dotnet,
  /// Go toolchains: module archives, plain-text diagnostics.
  Go,
  /// Anything else: no dependency handling, plain-text diagnostics.
  Generic,
}

impl LanguageFamily {
  /// Family of a language identifier, decided by prefix.
  pub fn of(language: &str) -> Self {
    let lower = language.to_ascii_lowercase();
    if lower.starts_with("csharp") || lower.starts_with("dotnet") {
      Self::Dotnet
    } else if lower.starts_with("go") {
      Self::Go
    } else {
      Self::Generic
    }
  }

  /// Whether a payload entry is a build-time dependency for this family.
  pub fn is_dependency(self, payload: &str) -> bool {
    match self {
      Self::Dotnet => payload.ends_with(".dll"),
      Self::Go => payload.ends_with(".tar.gz") || payload.ends_with(".tgz") || payload.ends_with(".zip"),
      Self::Generic => false,
    }
  }

  /// Template token replaced with this family's dependency expansion.
  pub fn dependency_token(self) -> Option<&'static str> {
    match self {
      Self::Dotnet => Some("references"),
      Self::Go => Some("modules"),
      Self::Generic => None,
    }
  }

  /// Whether the toolchain writes structured (SARIF) diagnostics.
  pub fn structured_diagnostics(self) -> bool {
    matches!(self, Self::Dotnet)
  }

  /// Whether the expanded command needs a shell to interpret chaining.
  pub fn needs_shell(self) -> bool {
    matches!(self, Self::Go)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Dotnet => "dotnet",
      Self::Go => "go",
      Self::Generic => "generic",
    }
  }
}

impl fmt::Display for LanguageFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How to compile one language. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
  /// Container image reference, e.g. `mcr.microsoft.com/dotnet/sdk:8.0`.
  #[serde(rename = "docker")]
  pub image: String,

  /// Working directory inside the container; the staging directory is
  /// mounted here.
  #[serde(rename = "workdir")]
  pub working_dir: String,

  /// Build command template with `{code}`, `{build_target}` and the
  /// family dependency token.
  #[serde(rename = "build_command", alias = "entrypoint_args")]
  pub command_template: String,

  /// Extension appended to the staged source file, without the dot.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extension: Option<String>,

  /// Words placed before the expanded command.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entrypoint: Option<String>,

  /// Overrides the prefix-derived family.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub family: Option<LanguageFamily>,
}

impl BuildEnvironment {
  pub fn family_for(&self, language: &str) -> LanguageFamily {
    self.family.unwrap_or_else(|| LanguageFamily::of(language))
  }

  /// Staged source filename, e.g. `code.cs`.
  pub fn source_file(&self) -> String {
    match self.extension.as_deref().map(|e| e.trim_start_matches('.')) {
      Some(ext) if !ext.is_empty() => format!("{}.{ext}", crate::consts::BUILD_FILE),
      _ => crate::consts::BUILD_FILE.to_string(),
    }
  }
}

fn default_max_attempts() -> u32 {
  3
}

/// The environments file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
  /// Root for payloads and build directories.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub root: Option<PathBuf>,

  /// Upper bound on a single container run, e.g. `10m`.
  #[serde(default, with = "humantime_opt", skip_serializing_if = "Option::is_none")]
  pub timeout: Option<Duration>,

  /// Build attempts allowed per target before giving up.
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,

  /// Enabled build environments keyed by language identifier.
  #[serde(default)]
  pub enabled: BTreeMap<String, BuildEnvironment>,
}

mod humantime_opt {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
      Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw
      .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
      .transpose()
  }
}
