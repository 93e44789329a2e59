//! SBOM generation.

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use super::types::{SbomArtifact, SbomDocument, SbomError};
use crate::util::hash::hash_file;

pub trait SbomGenerator {
  fn generate(&self, dir: &Path) -> Result<SbomDocument, SbomError>;
}

/// Records every regular file below a directory, sorted by path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectorySbomGenerator;

impl DirectorySbomGenerator {
  pub fn new() -> Self {
    Self
  }
}

impl SbomGenerator for DirectorySbomGenerator {
  fn generate(&self, dir: &Path) -> Result<SbomDocument, SbomError> {
    let mut artifacts = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
      let entry = entry.map_err(|source| SbomError::Scan {
        path: dir.to_path_buf(),
        source,
      })?;
      if !entry.file_type().is_file() {
        continue;
      }

      let size = entry
        .metadata()
        .map_err(|source| SbomError::Scan {
          path: dir.to_path_buf(),
          source,
        })?
        .len();
      let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());

      artifacts.push(SbomArtifact {
        name: entry.file_name().to_string_lossy().into_owned(),
        path: relative.to_string_lossy().replace('\\', "/"),
        size,
        sha256: hash_file(entry.path())?.0,
      });
    }

    debug!(dir = %dir.display(), artifacts = artifacts.len(), "scanned SBOM artifacts");
    Ok(SbomDocument {
      source: dir.to_string_lossy().into_owned(),
      artifacts,
    })
  }
}
