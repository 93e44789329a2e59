use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::HashError;

/// Supported SBOM media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SbomFormat {
  CycloneDx,
  Spdx,
  Syft,
}

impl SbomFormat {
  pub const ALL: [SbomFormat; 3] = [SbomFormat::CycloneDx, SbomFormat::Spdx, SbomFormat::Syft];

  pub fn media_type(&self) -> &'static str {
    match self {
      SbomFormat::CycloneDx => "application/vnd.cyclonedx+json",
      SbomFormat::Spdx => "application/spdx+json",
      SbomFormat::Syft => "application/vnd.syft+json",
    }
  }

  /// File extension used when the rendering is written next to its layer.
  pub fn extension(&self) -> &'static str {
    match self {
      SbomFormat::CycloneDx => "cdx.json",
      SbomFormat::Spdx => "spdx.json",
      SbomFormat::Syft => "syft.json",
    }
  }
}

impl std::fmt::Display for SbomFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.media_type())
  }
}

impl FromStr for SbomFormat {
  type Err = SbomError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    SbomFormat::ALL
      .into_iter()
      .find(|format| format.media_type() == s)
      .ok_or_else(|| SbomError::UnsupportedFormat(s.to_string()))
  }
}

/// A file found in the scanned directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbomArtifact {
  pub name: String,
  /// Path relative to the scanned directory, `/`-separated.
  pub path: String,
  pub size: u64,
  pub sha256: String,
}

/// Format-agnostic inventory produced by a generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbomDocument {
  pub source: String,
  pub artifacts: Vec<SbomArtifact>,
}

/// One rendering of an SBOM document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedSbom {
  pub format: SbomFormat,
  pub content: String,
}

#[derive(Debug, Error)]
pub enum SbomError {
  #[error("\"{0}\" is not a supported SBOM format")]
  UnsupportedFormat(String),

  #[error("failed to scan {path}: {source}")]
  Scan {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to digest SBOM artifact: {0}")]
  Digest(#[from] HashError),

  #[error("failed to render {format} SBOM: {source}")]
  Render {
    format: SbomFormat,
    #[source]
    source: serde_json::Error,
  },
}
