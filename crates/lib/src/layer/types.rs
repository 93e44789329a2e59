use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sbom::FormattedSbom;

/// Where a layer is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFlags {
  /// Available to later build steps.
  #[serde(default)]
  pub build: bool,
  /// Restored on the next build.
  #[serde(default)]
  pub cache: bool,
  /// Exported into the runtime image.
  #[serde(default)]
  pub launch: bool,
}

impl LayerFlags {
  pub fn launch_only() -> Self {
    Self {
      launch: true,
      ..Self::default()
    }
  }

  pub fn cache_only() -> Self {
    Self {
      cache: true,
      ..Self::default()
    }
  }
}

/// Cache bookkeeping stored on the targets layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetsMetadata {
  pub cache_sha: String,
  #[serde(with = "rfc3339_nanos")]
  pub built_at: DateTime<Utc>,
}

/// `built_at` is always written with nine fractional digits and a `Z` suffix.
pub mod rfc3339_nanos {
  use chrono::{DateTime, SecondsFormat, Utc};
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
  }

  pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
      .map(|parsed| parsed.with_timezone(&Utc))
      .map_err(serde::de::Error::custom)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
  pub name: String,
  pub path: PathBuf,
  pub flags: LayerFlags,
  pub metadata: toml::Table,
  pub sbom: Vec<FormattedSbom>,
}

impl Layer {
  /// Decode the typed targets metadata.
  ///
  /// Returns `Ok(None)` on a first build, when no `cache_sha` was recorded.
  pub fn targets_metadata(&self) -> Result<Option<TargetsMetadata>, LayerError> {
    if !self.metadata.contains_key("cache_sha") {
      return Ok(None);
    }

    toml::Value::Table(self.metadata.clone())
      .try_into()
      .map(Some)
      .map_err(|source| LayerError::DecodeMetadata {
        layer: self.name.clone(),
        source,
      })
  }

  pub fn set_targets_metadata(&mut self, metadata: &TargetsMetadata) -> Result<(), LayerError> {
    let encoded = toml::Value::try_from(metadata).map_err(|source| LayerError::EncodeMetadata {
      layer: self.name.clone(),
      source,
    })?;

    self.metadata = match encoded {
      toml::Value::Table(table) => table,
      _ => toml::Table::new(),
    };
    Ok(())
  }

  /// Empty the layer directory and forget everything recorded about it.
  pub fn reset(&mut self) -> Result<(), LayerError> {
    match std::fs::remove_dir_all(&self.path) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(source) => {
        return Err(LayerError::Reset {
          path: self.path.clone(),
          source,
        });
      }
    }

    std::fs::create_dir_all(&self.path).map_err(|source| LayerError::Reset {
      path: self.path.clone(),
      source,
    })?;

    self.flags = LayerFlags::default();
    self.metadata.clear();
    self.sbom.clear();
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum LayerError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid metadata on layer '{layer}': {source}")]
  DecodeMetadata {
    layer: String,
    #[source]
    source: toml::de::Error,
  },

  #[error("failed to encode metadata for layer '{layer}': {source}")]
  EncodeMetadata {
    layer: String,
    #[source]
    source: toml::ser::Error,
  },

  #[error("failed to reset layer directory {path}: {source}")]
  Reset {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize layer '{layer}': {source}")]
  Serialize {
    layer: String,
    #[source]
    source: toml::ser::Error,
  },
}
