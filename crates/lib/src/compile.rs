//! Go toolchain invocation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Everything one compiler invocation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoBuildConfiguration {
  pub workspace: PathBuf,
  pub output: PathBuf,
  pub go_path: Option<PathBuf>,
  pub go_cache: PathBuf,
  pub flags: Vec<String>,
  pub targets: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CompileError {
  #[error("failed to create output directory {path}: {source}")]
  CreateOutput {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to run {cmd}: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: io::Error,
  },

  #[error("{cmd} failed with exit code {code:?}: {stderr}")]
  Failed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to parse go list output: {0}")]
  ListOutput(#[source] serde_json::Error),

  #[error("go list reported {found} packages for {expected} targets")]
  TargetMismatch { expected: usize, found: usize },
}

pub trait BuildProcess {
  /// Compile every target and return the produced binaries in target order.
  fn execute(&self, config: &GoBuildConfiguration) -> Result<Vec<PathBuf>, CompileError>;
}

#[derive(Debug, Deserialize)]
struct GoPackage {
  #[serde(rename = "ImportPath")]
  import_path: String,
}

/// Runs `go build` followed by `go list --json` to name the binaries.
#[derive(Debug, Clone)]
pub struct GoBuildProcess {
  go: PathBuf,
}

impl Default for GoBuildProcess {
  fn default() -> Self {
    Self { go: PathBuf::from("go") }
  }
}

impl GoBuildProcess {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use a specific toolchain binary instead of `go` from `PATH`.
  pub fn with_toolchain(go: impl Into<PathBuf>) -> Self {
    Self { go: go.into() }
  }

  fn command(&self, config: &GoBuildConfiguration) -> Command {
    let mut command = Command::new(&self.go);
    command.current_dir(&config.workspace).env("GOCACHE", &config.go_cache);

    match &config.go_path {
      Some(go_path) => {
        command.env("GOPATH", go_path).env("GO111MODULE", "off");
      }
      None => {
        command.env("GO111MODULE", "on");
      }
    }
    command
  }

  fn run(&self, config: &GoBuildConfiguration, args: &[String]) -> Result<Vec<u8>, CompileError> {
    let cmd = format!("{} {}", self.go.display(), args.join(" "));
    debug!(cmd = %cmd, workspace = %config.workspace.display(), "spawning go");

    let output = self
      .command(config)
      .args(args)
      .output()
      .map_err(|source| CompileError::Spawn { cmd: cmd.clone(), source })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      return Err(CompileError::Failed {
        cmd,
        code: output.status.code(),
        stderr,
      });
    }

    Ok(output.stdout)
  }
}

impl BuildProcess for GoBuildProcess {
  fn execute(&self, config: &GoBuildConfiguration) -> Result<Vec<PathBuf>, CompileError> {
    std::fs::create_dir_all(&config.output).map_err(|source| CompileError::CreateOutput {
      path: config.output.clone(),
      source,
    })?;

    let mut build_args = vec![
      "build".to_string(),
      "-o".to_string(),
      config.output.to_string_lossy().into_owned(),
    ];
    build_args.extend(config.flags.iter().cloned());
    build_args.extend(config.targets.iter().cloned());

    info!(targets = ?config.targets, "compiling Go targets");
    self.run(config, &build_args)?;

    let mut list_args = vec!["list".to_string(), "--json".to_string()];
    list_args.extend(config.targets.iter().cloned());
    let listing = self.run(config, &list_args)?;

    let binaries = binaries_from_listing(&listing, &config.output)?;
    if binaries.len() != config.targets.len() {
      return Err(CompileError::TargetMismatch {
        expected: config.targets.len(),
        found: binaries.len(),
      });
    }

    info!(count = binaries.len(), "compilation complete");
    Ok(binaries)
  }
}

/// `go list --json` prints one JSON object per package, back to back.
fn binaries_from_listing(listing: &[u8], output: &Path) -> Result<Vec<PathBuf>, CompileError> {
  serde_json::Deserializer::from_slice(listing)
    .into_iter::<GoPackage>()
    .map(|package| {
      let package = package.map_err(CompileError::ListOutput)?;
      let name = package.import_path.rsplit('/').next().unwrap_or(&package.import_path);
      Ok(output.join(name))
    })
    .collect()
}
