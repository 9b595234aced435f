//! Toolchain diagnostics left in the staging directory.
//!
//! Every diagnostic is emitted at info level for operators. Diagnostics never
//! fail a build; whether an artifact was produced is decided elsewhere.

mod sarif;

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::consts::DIAGNOSTICS_FILE;
use crate::environment::LanguageFamily;

pub use sarif::{Region, SarifLog};

/// Where a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub file: String,
  pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub severity: Option<String>,
  pub rule_id: Option<String>,
  pub message: String,
  pub location: Option<Location>,
}

impl Diagnostic {
  fn line(message: &str) -> Self {
    Self {
      severity: None,
      rule_id: None,
      message: message.to_string(),
      location: None,
    }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(Location { file, region }) = &self.location {
      write!(
        f,
        "{file}({},{},{},{}): ",
        region.start_line, region.start_column, region.end_line, region.end_column
      )?;
    }
    match (&self.severity, &self.rule_id) {
      (Some(severity), Some(rule)) => write!(f, "{severity} {rule}: ")?,
      (Some(severity), None) => write!(f, "{severity}: ")?,
      (None, Some(rule)) => write!(f, "{rule}: ")?,
      (None, None) => {}
    }
    f.write_str(&self.message)
  }
}

/// Parse SARIF results into diagnostics.
pub fn parse_sarif(content: &str) -> Result<Vec<Diagnostic>, serde_json::Error> {
  let log: SarifLog = serde_json::from_str(content)?;
  let diagnostics = log
    .runs
    .iter()
    .flat_map(|run| &run.results)
    .map(|result| Diagnostic {
      severity: result.level.clone(),
      rule_id: result.rule_id.clone(),
      message: result.message.as_ref().map(|m| m.text().to_string()).unwrap_or_default(),
      location: result.locations.first().and_then(|loc| loc.file_and_region()).map(|(uri, region)| Location {
        file: file_name(uri),
        region,
      }),
    })
    .collect();
  Ok(diagnostics)
}

/// One diagnostic per non-blank line, trailing whitespace trimmed.
pub fn parse_lines(content: &str) -> Vec<Diagnostic> {
  content
    .lines()
    .map(str::trim_end)
    .filter(|line| !line.is_empty())
    .map(Diagnostic::line)
    .collect()
}

/// Last path component of a file URI or path.
fn file_name(uri: &str) -> String {
  let path = uri.strip_prefix("file://").unwrap_or(uri);
  path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

/// Read and log the diagnostics file in `dir`, if the toolchain left one.
pub async fn parse_diagnostics(dir: &Path, language: &str, family: LanguageFamily) -> Vec<Diagnostic> {
  let path = dir.join(DIAGNOSTICS_FILE);
  let content = match tokio::fs::read(&path).await {
    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
    Err(e) => {
      warn!(language = %language, path = %path.display(), error = %e, "failed to read diagnostics");
      return Vec::new();
    }
  };

  let diagnostics = if family.structured_diagnostics() {
    match parse_sarif(&content) {
      Ok(diagnostics) => diagnostics,
      Err(e) => {
        warn!(language = %language, error = %e, "malformed structured diagnostics, logging raw lines");
        parse_lines(&content)
      }
    }
  } else {
    parse_lines(&content)
  };

  for diagnostic in &diagnostics {
    info!(language = %language, "{diagnostic}");
  }
  diagnostics
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracing_test::traced_test;

  const SARIF_V1: &str = r#"{
  "$schema": "http://json.schemastore.org/sarif-1.0.0",
  "version": "1.0.0",
  "runs": [{
    "tool": { "name": "Microsoft (R) Visual C# Compiler" },
    "results": [
      {
        "ruleId": "CS1002",
        "level": "error",
        "message": "; expected",
        "locations": [{
          "resultFile": {
            "uri": "file:///build/code.cs",
            "region": { "startLine": 3, "startColumn": 14, "endLine": 3, "endColumn": 15 }
          }
        }]
      },
      { "ruleId": "CS2008", "level": "warning", "message": "No source files specified." }
    ]
  }]
}"#;

  const SARIF_V2: &str = r#"{
  "version": "2.1.0",
  "runs": [{
    "results": [{
      "ruleId": "CS0103",
      "level": "error",
      "message": { "text": "The name 'x' does not exist in the current context" },
      "locations": [{
        "physicalLocation": {
          "artifactLocation": { "uri": "file:///build/code.cs" },
          "region": { "startLine": 7, "startColumn": 9, "endLine": 7, "endColumn": 10 }
        }
      }]
    }]
  }]
}"#;

  #[test]
  fn sarif_v1_results_formatted_with_location() {
    let diagnostics = parse_sarif(SARIF_V1).unwrap();
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].to_string(), "code.cs(3,14,3,15): error CS1002: ; expected");
    assert_eq!(diagnostics[1].to_string(), "warning CS2008: No source files specified.");
  }

  #[test]
  fn sarif_v2_results_formatted_with_location() {
    let diagnostics = parse_sarif(SARIF_V2).unwrap();
    assert_eq!(
      diagnostics[0].to_string(),
      "code.cs(7,9,7,10): error CS0103: The name 'x' does not exist in the current context"
    );
  }

  #[test]
  fn plain_lines_trimmed_and_blank_lines_skipped() {
    let diagnostics = parse_lines("./code.go:3:2: undefined: x   \n\n# command-line-arguments\t\n");
    let lines: Vec<String> = diagnostics.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["./code.go:3:2: undefined: x", "# command-line-arguments"]);
  }

  #[tokio::test]
  async fn missing_file_is_noop() {
    let temp = tempfile::tempdir().unwrap();
    assert!(parse_diagnostics(temp.path(), "csharp", LanguageFamily::Dotnet).await.is_empty());
  }

  #[tokio::test]
  #[traced_test]
  async fn structured_family_logs_each_result() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join(DIAGNOSTICS_FILE), SARIF_V1).unwrap();

    let diagnostics = parse_diagnostics(temp.path(), "csharp", LanguageFamily::Dotnet).await;

    assert_eq!(diagnostics.len(), 2);
    assert!(logs_contain("code.cs(3,14,3,15): error CS1002: ; expected"));
  }

  #[tokio::test]
  #[traced_test]
  async fn malformed_structured_file_falls_back_to_lines() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join(DIAGNOSTICS_FILE), "error: not json\n").unwrap();

    let diagnostics = parse_diagnostics(temp.path(), "csharp", LanguageFamily::Dotnet).await;

    assert_eq!(diagnostics, vec![Diagnostic::line("error: not json")]);
    assert!(logs_contain("malformed structured diagnostics"));
  }

  #[tokio::test]
  async fn plain_family_reads_lines() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join(DIAGNOSTICS_FILE), "{\"runs\": []}\n").unwrap();

    let diagnostics = parse_diagnostics(temp.path(), "go", LanguageFamily::Go).await;

    assert_eq!(diagnostics, vec![Diagnostic::line("{\"runs\": []}")]);
  }
}
