//! Loading and persisting layers under the layers root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{Layer, LayerError, LayerFlags};
use crate::sbom::SbomFormat;

/// On-disk shape of `<layers>/<name>.toml`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LayerFile {
  #[serde(default)]
  launch: bool,
  #[serde(default)]
  build: bool,
  #[serde(default)]
  cache: bool,
  #[serde(default)]
  metadata: toml::Table,
}

/// The layers root handed to a build.
#[derive(Debug, Clone)]
pub struct Layers {
  path: PathBuf,
}

impl Layers {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn metadata_path(&self, name: &str) -> PathBuf {
    self.path.join(format!("{}.toml", name))
  }

  fn sbom_path(&self, name: &str, format: SbomFormat) -> PathBuf {
    self.path.join(format!("{}.sbom.{}", name, format.extension()))
  }

  /// Load a layer from its persisted metadata.
  ///
  /// A missing metadata file yields a fresh layer with all flags off.
  pub fn get(&self, name: &str) -> Result<Layer, LayerError> {
    let metadata_path = self.metadata_path(name);

    let file = match fs::read_to_string(&metadata_path) {
      Ok(content) => toml::from_str::<LayerFile>(&content).map_err(|source| LayerError::Parse {
        path: metadata_path.clone(),
        source,
      })?,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(layer = name, "no persisted metadata, starting fresh");
        LayerFile::default()
      }
      Err(source) => {
        return Err(LayerError::Read {
          path: metadata_path,
          source,
        });
      }
    };

    Ok(Layer {
      name: name.to_string(),
      path: self.path.join(name),
      flags: LayerFlags {
        build: file.build,
        cache: file.cache,
        launch: file.launch,
      },
      metadata: file.metadata,
      sbom: Vec::new(),
    })
  }

  /// Write the layer's metadata file and any attached SBOM documents.
  ///
  /// Files are written to a temporary sibling and renamed into place.
  pub fn persist(&self, layer: &Layer) -> Result<(), LayerError> {
    fs::create_dir_all(&self.path).map_err(|source| LayerError::Write {
      path: self.path.clone(),
      source,
    })?;

    let file = LayerFile {
      launch: layer.flags.launch,
      build: layer.flags.build,
      cache: layer.flags.cache,
      metadata: layer.metadata.clone(),
    };
    let content = toml::to_string(&file).map_err(|source| LayerError::Serialize {
      layer: layer.name.clone(),
      source,
    })?;
    write_atomic(&self.metadata_path(&layer.name), &content)?;

    for format in SbomFormat::ALL {
      if layer.sbom.iter().any(|document| document.format == format) {
        continue;
      }
      let stale = self.sbom_path(&layer.name, format);
      match fs::remove_file(&stale) {
        Ok(()) => debug!(path = %stale.display(), "removed stale SBOM"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(LayerError::Write { path: stale, source }),
      }
    }

    for document in &layer.sbom {
      write_atomic(&self.sbom_path(&layer.name, document.format), &document.content)?;
    }

    debug!(layer = %layer.name, sbom_documents = layer.sbom.len(), "layer persisted");
    Ok(())
  }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), LayerError> {
  let write_error = |source| LayerError::Write {
    path: path.to_path_buf(),
    source,
  };

  let mut temp_name = path.as_os_str().to_owned();
  temp_name.push(".tmp");
  let temp_path = PathBuf::from(temp_name);

  fs::write(&temp_path, content).map_err(write_error)?;
  fs::rename(&temp_path, path).map_err(write_error)
}
