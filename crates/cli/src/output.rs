//! Terminal output for the builder CLI.
//!
//! Status lines go to stdout, except warnings and errors, which go to
//! stderr so `--json` output stays parseable.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream, Style};

pub mod symbols {
  pub const ARROW: &str = "→";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
  Success,
  Info,
  Warning,
  Error,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Success => "✓",
      Status::Info => "•",
      Status::Warning => "⚠",
      Status::Error => "✗",
    }
  }

  fn style(self) -> Style {
    match self {
      Status::Success => Style::new().green(),
      Status::Info => Style::new().blue(),
      Status::Warning => Style::new().yellow(),
      Status::Error => Style::new().red(),
    }
  }
}

fn print_status(status: Status, message: &str) {
  match status {
    Status::Success | Status::Info => println!(
      "{} {}",
      status.symbol().if_supports_color(Stream::Stdout, |s| s.style(status.style())),
      message
    ),
    // Problems are colored in full so they stand out among log lines.
    Status::Warning | Status::Error => eprintln!(
      "{} {}",
      status.symbol().if_supports_color(Stream::Stderr, |s| s.style(status.style())),
      message.if_supports_color(Stream::Stderr, |m| m.style(status.style()))
    ),
  }
}

/// Elapsed time rounded to milliseconds, e.g. `1s 500ms` or `2m 5s`.
pub fn format_duration(duration: Duration) -> String {
  let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
  if millis == 0 {
    return "0ms".to_string();
  }
  humantime::format_duration(Duration::from_millis(millis)).to_string()
}

pub fn print_success(message: &str) {
  print_status(Status::Success, message);
}

pub fn print_error(message: &str) {
  print_status(Status::Error, message);
}

pub fn print_warning(message: &str) {
  print_status(Status::Warning, message);
}

pub fn print_info(message: &str) {
  print_status(Status::Info, message);
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn durations_round_to_milliseconds() {
    assert_eq!(format_duration(Duration::ZERO), "0ms");
    assert_eq!(format_duration(Duration::from_micros(50_400)), "50ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1s 500ms");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
  }
}
