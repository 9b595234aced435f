//! Build environment registry.
//!
//! Environments come from a YAML file loaded once at startup:
//!
//! ```yaml
//! timeout: 10m
//! enabled:
//!   csharp:
//!     docker: mcr.microsoft.com/dotnet/sdk:8.0
//!     workdir: /build
//!     extension: cs
//!     build_command: csc -out:{build_target} {references} -errorlog:errors.log {code}
//! ```

mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use types::*;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("environment '{language}' has an empty {field}")]
  EmptyField { language: String, field: &'static str },
}

impl BuilderConfig {
  /// Load and validate an environments file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.validate()?;
    debug!(path = %path.display(), environments = config.enabled.len(), "loaded build config");
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    for (language, env) in &self.enabled {
      let empty = |field: &'static str| ConfigError::EmptyField {
        language: language.clone(),
        field,
      };
      if env.image.trim().is_empty() {
        return Err(empty("docker"));
      }
      if env.working_dir.trim().is_empty() {
        return Err(empty("workdir"));
      }
      if env.command_template.trim().is_empty() {
        return Err(empty("build_command"));
      }
    }
    Ok(())
  }
}

/// Read-only lookup of environments by language.
#[derive(Debug, Clone, Default)]
pub struct Registry {
  environments: BTreeMap<String, BuildEnvironment>,
}

impl Registry {
  pub fn new(environments: BTreeMap<String, BuildEnvironment>) -> Self {
    Self { environments }
  }

  pub fn resolve(&self, language: &str) -> Option<&BuildEnvironment> {
    self.environments.get(language)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &BuildEnvironment)> {
    self.environments.iter()
  }

  pub fn len(&self) -> usize {
    self.environments.len()
  }

  pub fn is_empty(&self) -> bool {
    self.environments.is_empty()
  }

  /// The enabled mapping, as served to operators.
  pub fn as_map(&self) -> &BTreeMap<String, BuildEnvironment> {
    &self.environments
  }
}

impl From<&BuilderConfig> for Registry {
  fn from(config: &BuilderConfig) -> Self {
    Self::new(config.enabled.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  const CONFIG: &str = r#"
timeout: 90s
max_attempts: 2
enabled:
  csharp:
    docker: mcr.microsoft.com/dotnet/sdk:8.0
    workdir: /build
    extension: cs
    build_command: "csc -out:{build_target} {references} {code}"
  go_windows:
    docker: golang:1.22
    workdir: /go/src/build
    extension: go
    build_command: "{modules} go build -o {build_target} {code}"
  nim:
    docker: nimlang/nim
    workdir: /src
    entrypoint: nim
    entrypoint_args: "c -o:#{build_target} #{code}"
    family: generic
"#;

  fn parse(yaml: &str) -> BuilderConfig {
    serde_yaml::from_str(yaml).unwrap()
  }

  #[test]
  fn parses_environments_file() {
    let config = parse(CONFIG);
    assert_eq!(config.timeout, Some(Duration::from_secs(90)));
    assert_eq!(config.max_attempts, 2);
    assert_eq!(config.enabled.len(), 3);

    let csharp = &config.enabled["csharp"];
    assert_eq!(csharp.image, "mcr.microsoft.com/dotnet/sdk:8.0");
    assert_eq!(csharp.working_dir, "/build");
    assert_eq!(csharp.source_file(), "code.cs");

    let nim = &config.enabled["nim"];
    assert_eq!(nim.entrypoint.as_deref(), Some("nim"));
    assert_eq!(nim.source_file(), "code");
    assert_eq!(nim.family, Some(LanguageFamily::Generic));
  }

  #[test]
  fn defaults_when_optional_keys_missing() {
    let config = parse("enabled: {}\n");
    assert_eq!(config.timeout, None);
    assert_eq!(config.max_attempts, 3);
    assert!(config.root.is_none());
  }

  #[test]
  fn family_is_prefix_matched() {
    assert_eq!(LanguageFamily::of("csharp"), LanguageFamily::Dotnet);
    assert_eq!(LanguageFamily::of("csharp_net45"), LanguageFamily::Dotnet);
    assert_eq!(LanguageFamily::of("go_linux"), LanguageFamily::Go);
    assert_eq!(LanguageFamily::of("nim"), LanguageFamily::Generic);
  }

  #[test]
  fn explicit_family_overrides_prefix() {
    let config = parse(CONFIG);
    let mut env = config.enabled["go_windows"].clone();
    assert_eq!(env.family_for("go_windows"), LanguageFamily::Go);
    env.family = Some(LanguageFamily::Generic);
    assert_eq!(env.family_for("go_windows"), LanguageFamily::Generic);
  }

  #[test]
  fn dependency_conventions() {
    assert!(LanguageFamily::Dotnet.is_dependency("lib.dll"));
    assert!(!LanguageFamily::Dotnet.is_dependency("mod.tar.gz"));
    assert!(LanguageFamily::Go.is_dependency("mod.tar.gz"));
    assert!(LanguageFamily::Go.is_dependency("mod.zip"));
    assert!(!LanguageFamily::Generic.is_dependency("lib.dll"));
  }

  #[test]
  fn validate_rejects_empty_image() {
    let mut config = parse(CONFIG);
    config.enabled.get_mut("csharp").unwrap().image = " ".to_string();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::EmptyField { field: "docker", .. }));
  }

  #[test]
  fn load_reports_missing_file() {
    let err = BuilderConfig::load(Path::new("/nonexistent/environments.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }

  #[test]
  fn load_reads_file_from_disk() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("environments.yml");
    std::fs::write(&path, CONFIG).unwrap();
    let config = BuilderConfig::load(&path).unwrap();
    let registry = Registry::from(&config);
    assert!(registry.resolve("csharp").is_some());
    assert!(registry.resolve("rust").is_none());
  }

  #[test]
  fn timeout_round_trips_as_humantime() {
    let config = parse(CONFIG);
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert!(yaml.contains("timeout: 1m 30s"));
  }
}
