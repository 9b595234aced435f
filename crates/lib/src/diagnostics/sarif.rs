//! The subset of SARIF the .NET compiler writes with `-errorlog`.
//!
//! Both the 1.0 layout (`locations[].resultFile`, string messages) and the
//! 2.1 layout (`locations[].physicalLocation`, `{ "text": .. }` messages)
//! are accepted.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SarifLog {
  #[serde(default)]
  pub runs: Vec<Run>,
}

#[derive(Debug, Deserialize)]
pub struct Run {
  #[serde(default)]
  pub results: Vec<SarifResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
  #[serde(default)]
  pub rule_id: Option<String>,
  #[serde(default)]
  pub level: Option<String>,
  #[serde(default)]
  pub message: Option<Message>,
  #[serde(default)]
  pub locations: Vec<ResultLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Message {
  Plain(String),
  Text { text: String },
}

impl Message {
  pub fn text(&self) -> &str {
    match self {
      Self::Plain(text) | Self::Text { text } => text,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultLocation {
  #[serde(default)]
  pub result_file: Option<FileLocation>,
  #[serde(default)]
  pub physical_location: Option<PhysicalLocation>,
}

/// SARIF 1.0 location.
#[derive(Debug, Deserialize)]
pub struct FileLocation {
  #[serde(default)]
  pub uri: String,
  #[serde(default)]
  pub region: Option<Region>,
}

/// SARIF 2.1 location.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalLocation {
  #[serde(default)]
  pub artifact_location: Option<ArtifactLocation>,
  #[serde(default)]
  pub region: Option<Region>,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactLocation {
  #[serde(default)]
  pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
  #[serde(default)]
  pub start_line: u32,
  #[serde(default)]
  pub start_column: u32,
  #[serde(default)]
  pub end_line: u32,
  #[serde(default)]
  pub end_column: u32,
}

impl ResultLocation {
  /// The reported file and region, whichever layout carries them.
  pub fn file_and_region(&self) -> Option<(&str, Region)> {
    if let Some(file) = &self.result_file {
      return file.region.map(|r| (file.uri.as_str(), r));
    }
    let physical = self.physical_location.as_ref()?;
    let uri = physical.artifact_location.as_ref().map(|a| a.uri.as_str()).unwrap_or_default();
    physical.region.map(|r| (uri, r))
  }
}
