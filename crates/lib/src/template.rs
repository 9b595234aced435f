//! Build command templates.
//!
//! A template is the environment's `build_command` with tokens in braces:
//!
//! - `{code}` - staged source filename, e.g. `code.cs`
//! - `{build_target}` - the artifact name the target expects, verbatim
//! - `{references}` - .NET reference flag, `-r:a.dll,b.dll`
//! - `{modules}` - Go preamble unpacking module archives
//!
//! A `#` directly before the brace (`#{code}`) is accepted as the same token.
//! Any other brace group passes through unchanged, so shell expansions like
//! `${HOME}` need no escaping. Dependency tokens that do not belong to the
//! environment's family are left alone.
//!
//! When a dependency token expands to nothing it is dropped together with the
//! whitespace around it, so no dangling flag or separator is emitted.
//!
//! ```
//! use builder_lib::environment::LanguageFamily;
//! use builder_lib::template::expand_template;
//!
//! let cmd = expand_template(
//!   "csc -out:{build_target} {references} {code}",
//!   LanguageFamily::Dotnet,
//!   "code.cs",
//!   "out.exe",
//!   &["a.dll".to_string()],
//! );
//! assert_eq!(cmd, "csc -out:out.exe -r:a.dll code.cs");
//! ```

use std::fmt;

use crate::environment::{BuildEnvironment, LanguageFamily};
use crate::target::BuildTarget;

/// A parsed template piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  /// `{name}` or `#{name}`; `raw` is the original text.
  Token { name: String, raw: String },
}

/// The command handed to the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
  /// Executed directly, one word per argument.
  Argv(Vec<String>),
  /// Interpreted by `/bin/sh -c`.
  Shell(String),
}

impl fmt::Display for CommandLine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Argv(argv) => f.write_str(&argv.join(" ")),
      Self::Shell(script) => f.write_str(script),
    }
  }
}

/// Split a template into literals and brace tokens. Never fails: anything
/// that is not a well-formed token is literal text.
pub fn parse(template: &str) -> Vec<Segment> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut rest = template;

  while !rest.is_empty() {
    let (prefix_len, open) = if rest.starts_with("#{") {
      (1, true)
    } else {
      (0, rest.starts_with('{'))
    };

    if open && let Some(close) = rest[prefix_len..].find('}') {
      let name = &rest[prefix_len + 1..prefix_len + close];
      if is_token_name(name) {
        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        let end = prefix_len + close + 1;
        segments.push(Segment::Token {
          name: name.to_string(),
          raw: rest[..end].to_string(),
        });
        rest = &rest[end..];
        continue;
      }
    }

    let ch = rest.chars().next().unwrap_or_default();
    literal.push(ch);
    rest = &rest[ch.len_utf8()..];
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }
  segments
}

fn is_token_name(name: &str) -> bool {
  !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The dependency expansion for a family, empty when there is nothing to add.
pub fn dependency_expansion(family: LanguageFamily, dependencies: &[String]) -> String {
  if dependencies.is_empty() {
    return String::new();
  }
  match family {
    LanguageFamily::Dotnet => format!("-r:{}", dependencies.join(",")),
    LanguageFamily::Go => {
      let mut steps: Vec<String> = dependencies
        .iter()
        .map(|archive| {
          if archive.ends_with(".zip") {
            format!("unzip -o -q {}", shell_quote(archive))
          } else {
            format!("tar -xzf {}", shell_quote(archive))
          }
        })
        .collect();
      steps.push("rm -f go.mod go.sum; go mod init payload && go mod tidy &&".to_string());
      steps.join(" && ")
    }
    LanguageFamily::Generic => String::new(),
  }
}

/// Single-quote a word for `/bin/sh`, so names from task files stay one
/// literal argument.
fn shell_quote(word: &str) -> String {
  format!("'{}'", word.replace('\'', r"'\''"))
}

/// Substitute every known token in `template`.
pub fn expand_template(
  template: &str,
  family: LanguageFamily,
  source_file: &str,
  build_target: &str,
  dependencies: &[String],
) -> String {
  let dependency_token = family.dependency_token();
  let mut out = String::new();
  let mut trim_next = false;

  for segment in parse(template) {
    match segment {
      Segment::Literal(text) => {
        if trim_next {
          out.push_str(text.trim_start());
          trim_next = false;
        } else {
          out.push_str(&text);
        }
      }
      Segment::Token { name, raw } => {
        let value = match name.as_str() {
          "code" => source_file.to_string(),
          "build_target" => build_target.to_string(),
          other if Some(other) == dependency_token => {
            let expansion = dependency_expansion(family, dependencies);
            if expansion.is_empty() {
              let kept = out.trim_end().len();
              out.truncate(kept);
              trim_next = out.is_empty();
              continue;
            }
            expansion
          }
          _ => raw,
        };
        out.push_str(&value);
        trim_next = false;
      }
    }
  }
  out
}

/// Dependencies a target declares for its family, in declared order.
pub fn declared_dependencies(family: LanguageFamily, target: &BuildTarget) -> Vec<String> {
  target
    .payloads
    .iter()
    .filter(|p| family.is_dependency(p))
    .cloned()
    .collect()
}

/// Expand an environment's template for a target using its declared
/// dependency names.
pub fn expand(env: &BuildEnvironment, target: &BuildTarget) -> CommandLine {
  let family = env.family_for(&target.language);
  expand_with(env, family, &target.build_target, &declared_dependencies(family, target))
}

/// Expand with an explicit dependency list (the names actually staged).
pub fn expand_with(
  env: &BuildEnvironment,
  family: LanguageFamily,
  build_target: &str,
  dependencies: &[String],
) -> CommandLine {
  let expanded = expand_template(
    &env.command_template,
    family,
    &env.source_file(),
    build_target,
    dependencies,
  );
  let entrypoint = env.entrypoint.as_deref().map(str::trim).filter(|e| !e.is_empty());

  if family.needs_shell() {
    let script = match entrypoint {
      Some(prefix) => format!("{prefix} {expanded}"),
      None => expanded,
    };
    return CommandLine::Shell(script);
  }

  let argv = entrypoint
    .into_iter()
    .flat_map(str::split_whitespace)
    .chain(expanded.split_whitespace())
    .map(str::to_string)
    .collect();
  CommandLine::Argv(argv)
}
