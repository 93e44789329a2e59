//! Build configuration.
//!
//! `EnvConfigurationParser` turns the `BP_GO_*` build environment into a
//! `BuildConfiguration`. The live-reload switch is read separately through
//! [`live_reload_enabled`] so the orchestrator decides it once per build.

use std::env;
use std::path::{Component, Path};

use thiserror::Error;
use tracing::{debug, warn};

pub const TARGETS_ENV: &str = "BP_GO_TARGETS";
pub const BUILD_FLAGS_ENV: &str = "BP_GO_BUILD_FLAGS";
pub const LDFLAGS_ENV: &str = "BP_GO_BUILD_LDFLAGS";
pub const IMPORT_PATH_ENV: &str = "BP_GO_BUILD_IMPORT_PATH";
pub const KEEP_FILES_ENV: &str = "BP_KEEP_FILES";
pub const LIVE_RELOAD_ENV: &str = "BP_LIVE_RELOAD_ENABLED";

/// Parsed build intent. The first target is the primary one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfiguration {
  pub targets: Vec<String>,
  pub flags: Vec<String>,
  pub import_path: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse {var} value {value}: invalid boolean syntax")]
  InvalidBool { var: &'static str, value: String },

  #[error("failed to parse {var}: value is not valid unicode")]
  NotUnicode { var: &'static str },

  #[error("failed to parse {var} value {value}: unbalanced quotes")]
  InvalidFlags { var: &'static str, value: String },

  #[error("failed to determine build targets: \"{0}\" is an absolute path, targets must be relative to the source directory")]
  AbsoluteTarget(String),

  #[error("failed to determine build targets: \"{0}\" points outside the source directory")]
  OutsideSource(String),

  #[error("failed to determine build targets: \"{0}\" is not a valid pattern")]
  InvalidTargetPattern(String),

  #[error("failed to find any targets that match \"{0}\"")]
  NoMatchingTargets(String),
}

pub trait ConfigurationParser {
  fn parse(&self, buildpack_version: &str, working_dir: &Path) -> Result<BuildConfiguration, ConfigError>;
}

/// Reads `BP_GO_TARGETS`, `BP_GO_BUILD_FLAGS`, `BP_GO_BUILD_LDFLAGS` and
/// `BP_GO_BUILD_IMPORT_PATH` from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvConfigurationParser;

impl EnvConfigurationParser {
  pub fn new() -> Self {
    Self
  }
}

impl ConfigurationParser for EnvConfigurationParser {
  fn parse(&self, buildpack_version: &str, working_dir: &Path) -> Result<BuildConfiguration, ConfigError> {
    if working_dir.join("buildpack.yml").exists() {
      warn!(
        version = buildpack_version,
        "buildpack.yml is not supported by this buildpack version, use BP_GO_* environment variables instead"
      );
    }

    let targets = match read_env(TARGETS_ENV)? {
      Some(raw) => resolve_targets(working_dir, raw.split(':').filter(|t| !t.is_empty()))?,
      None => vec![".".to_string()],
    };

    let mut flags = match read_env(BUILD_FLAGS_ENV)? {
      Some(raw) => shlex::split(&raw).ok_or(ConfigError::InvalidFlags {
        var: BUILD_FLAGS_ENV,
        value: raw.clone(),
      })?,
      None => Vec::new(),
    };

    if let Some(ldflags) = read_env(LDFLAGS_ENV)?
      && !has_flag(&flags, "-ldflags")
    {
      flags.push(format!("-ldflags={}", ldflags));
    }

    let flags = with_default_flags(flags, working_dir);
    let import_path = read_env(IMPORT_PATH_ENV)?.unwrap_or_default();

    debug!(?targets, ?flags, import_path = %import_path, "parsed build configuration");

    Ok(BuildConfiguration {
      targets,
      flags,
      import_path,
    })
  }
}

/// Read the live-reload switch from the build environment.
///
/// Unset means disabled. Any value other than a strict boolean literal is an
/// error that quotes the literal.
pub fn live_reload_enabled() -> Result<bool, ConfigError> {
  match read_env(LIVE_RELOAD_ENV)? {
    Some(value) => parse_bool(LIVE_RELOAD_ENV, &value),
    None => Ok(false),
  }
}

/// Strict boolean parsing: `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
  match value {
    "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
    "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
    _ => Err(ConfigError::InvalidBool {
      var,
      value: value.to_string(),
    }),
  }
}

fn read_env(var: &'static str) -> Result<Option<String>, ConfigError> {
  match env::var(var) {
    Ok(value) => Ok(Some(value)),
    Err(env::VarError::NotPresent) => Ok(None),
    Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { var }),
  }
}

/// True if `flags` sets `name`, either as `-name`, `-name=value`, or the
/// double-dash spellings.
pub fn has_flag(flags: &[String], name: &str) -> bool {
  let bare = name.trim_start_matches('-');
  flags.iter().any(|flag| {
    let stripped = flag.trim_start_matches('-');
    flag.starts_with('-') && (stripped == bare || stripped.starts_with(&format!("{}=", bare)))
  })
}

fn with_default_flags(mut flags: Vec<String>, working_dir: &Path) -> Vec<String> {
  if !has_flag(&flags, "-buildmode") {
    flags.insert(0, "-buildmode=pie".to_string());
  }
  if !has_flag(&flags, "-trimpath") {
    flags.push("-trimpath".to_string());
  }
  if !has_flag(&flags, "-mod") && working_dir.join("vendor").is_dir() {
    flags.push("-mod=vendor".to_string());
  }
  flags
}

/// Expand target patterns relative to `working_dir` into `./`-prefixed
/// directories, preserving the requested order.
fn resolve_targets<'a>(
  working_dir: &Path,
  patterns: impl Iterator<Item = &'a str>,
) -> Result<Vec<String>, ConfigError> {
  let mut targets = Vec::new();

  for pattern in patterns {
    if Path::new(pattern).is_absolute() {
      return Err(ConfigError::AbsoluteTarget(pattern.to_string()));
    }
    if Path::new(pattern).components().any(|c| matches!(c, Component::ParentDir)) {
      return Err(ConfigError::OutsideSource(pattern.to_string()));
    }

    let relative_pattern = normalize_target(Path::new(pattern));
    if relative_pattern == "." {
      if !targets.contains(&relative_pattern) {
        targets.push(relative_pattern);
      }
      continue;
    }

    let full_pattern = format!(
      "{}/{}",
      glob::Pattern::escape(&working_dir.to_string_lossy()),
      relative_pattern.trim_start_matches("./")
    );
    let matches = glob::glob(&full_pattern).map_err(|_| ConfigError::InvalidTargetPattern(pattern.to_string()))?;

    let mut found = false;
    for path in matches.flatten() {
      if !path.is_dir() {
        continue;
      }
      let relative = path.strip_prefix(working_dir).unwrap_or(&path);
      let target = normalize_target(relative);
      if !targets.contains(&target) {
        targets.push(target);
      }
      found = true;
    }

    if !found {
      return Err(ConfigError::NoMatchingTargets(pattern.to_string()));
    }
  }

  Ok(targets)
}

fn normalize_target(relative: &Path) -> String {
  let parts: Vec<String> = relative
    .components()
    .filter_map(|c| match c {
      Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect();

  if parts.is_empty() {
    ".".to_string()
  } else {
    format!("./{}", parts.join("/"))
  }
}
