//! Build-intent checksums.
//!
//! The checksum covers everything that decides what the compiler produces:
//! targets, flags, import path and the workspace contents.

use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::config::BuildConfiguration;
use crate::util::hash::{HashError, hash_directory};

#[derive(Debug, Error)]
pub enum ChecksumError {
  #[error("failed to checksum workspace: {0}")]
  Workspace(#[from] HashError),
}

pub trait ChecksumCalculator {
  fn sum(&self, configuration: &BuildConfiguration, working_dir: &Path) -> Result<String, ChecksumError>;
}

/// SHA-256 over a line-oriented rendering of the build intent.
#[derive(Debug, Default, Clone)]
pub struct Sha256ChecksumCalculator {
  exclude: Vec<String>,
}

impl Sha256ChecksumCalculator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Skip entries with these names when hashing the workspace.
  pub fn excluding<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      exclude: names.into_iter().map(Into::into).collect(),
    }
  }
}

impl ChecksumCalculator for Sha256ChecksumCalculator {
  fn sum(&self, configuration: &BuildConfiguration, working_dir: &Path) -> Result<String, ChecksumError> {
    let exclude: Vec<&str> = self.exclude.iter().map(String::as_str).collect();
    let workspace = hash_directory(working_dir, &exclude)?;

    let mut hasher = Sha256::new();
    for target in &configuration.targets {
      hasher.update(format!("target:{}\n", target));
    }
    for flag in &configuration.flags {
      hasher.update(format!("flag:{}\n", flag));
    }
    hasher.update(format!("import-path:{}\n", configuration.import_path));
    hasher.update(format!("workspace:{}\n", workspace));

    let sum = format!("{:x}", hasher.finalize());
    debug!(checksum = %sum, "computed build intent checksum");
    Ok(sum)
  }
}
