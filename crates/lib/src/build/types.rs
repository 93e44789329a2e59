use std::path::PathBuf;

use thiserror::Error;

use crate::checksum::ChecksumError;
use crate::compile::CompileError;
use crate::config::ConfigError;
use crate::launch::{LaunchError, Process};
use crate::layer::{Layer, LayerError};
use crate::sbom::SbomError;
use crate::source::SourceError;
use crate::workspace::PathError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildpackInfo {
  pub name: String,
  pub version: String,
  /// Requested SBOM media types.
  pub sbom_formats: Vec<String>,
}

/// Inputs for a single build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
  pub working_dir: PathBuf,
  pub layers_dir: PathBuf,
  pub stack: String,
  pub buildpack: BuildpackInfo,
}

/// Output of a successful build: `targets` then `gocache`, plus the
/// ordered launch processes.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
  pub layers: Vec<Layer>,
  pub processes: Vec<Process>,
}

impl BuildResult {
  pub fn layer(&self, name: &str) -> Option<&Layer> {
    self.layers.iter().find(|layer| layer.name == name)
  }

  pub fn default_process(&self) -> Option<&Process> {
    self.processes.iter().find(|process| process.default)
  }
}

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to parse layer content metadata: {source}")]
  LayerMetadata {
    layer: String,
    #[source]
    source: LayerError,
  },

  #[error("failed to prepare layer '{layer}': {source}")]
  LayerPrepare {
    layer: String,
    #[source]
    source: LayerError,
  },

  #[error("failed to persist layer '{layer}': {source}")]
  LayerPersist {
    layer: String,
    #[source]
    source: LayerError,
  },

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Path(#[from] PathError),

  #[error(transparent)]
  Checksum(#[from] ChecksumError),

  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error(transparent)]
  Launch(#[from] LaunchError),

  #[error(transparent)]
  Sbom(#[from] SbomError),

  #[error(transparent)]
  Source(#[from] SourceError),
}

impl BuildError {
  pub(crate) fn metadata(layer: &str) -> impl FnOnce(LayerError) -> BuildError + '_ {
    move |source| BuildError::LayerMetadata {
      layer: layer.to_string(),
      source,
    }
  }

  pub(crate) fn prepare(layer: &str) -> impl FnOnce(LayerError) -> BuildError + '_ {
    move |source| BuildError::LayerPrepare {
      layer: layer.to_string(),
      source,
    }
  }

  pub(crate) fn persist(layer: &str) -> impl FnOnce(LayerError) -> BuildError + '_ {
    move |source| BuildError::LayerPersist {
      layer: layer.to_string(),
      source,
    }
  }
}
