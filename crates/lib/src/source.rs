//! Source tree removal.
//!
//! After compilation the application source is deleted from the working
//! directory so it does not end up in the image. Paths matching a
//! `BP_KEEP_FILES` glob, and everything below a matching directory, survive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::KEEP_FILES_ENV;

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("failed to parse BP_KEEP_FILES pattern \"{pattern}\": {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("failed to walk source directory {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

pub trait SourceRemover {
  fn clear(&self, path: &Path) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, Default)]
pub struct SourceDeleter {
  keep: Vec<Pattern>,
}

impl SourceDeleter {
  pub fn new<I, S>(patterns: I) -> Result<Self, SourceError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let keep = patterns
      .into_iter()
      .map(|pattern| {
        let pattern = pattern.as_ref();
        Pattern::new(pattern.trim_start_matches("./")).map_err(|source| SourceError::InvalidPattern {
          pattern: pattern.to_string(),
          source,
        })
      })
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { keep })
  }

  /// Read colon-separated keep patterns from `BP_KEEP_FILES`.
  pub fn from_env() -> Result<Self, SourceError> {
    let raw = std::env::var(KEEP_FILES_ENV).unwrap_or_default();
    Self::new(raw.split(':').filter(|p| !p.is_empty()))
  }

  /// True if `relative` or one of its ancestors matches a keep pattern.
  fn is_kept(&self, relative: &Path) -> bool {
    relative
      .ancestors()
      .filter(|p| !p.as_os_str().is_empty())
      .any(|p| self.keep.iter().any(|pattern| pattern.matches_path(p)))
  }
}

impl SourceRemover for SourceDeleter {
  fn clear(&self, path: &Path) -> Result<(), SourceError> {
    let mut removed = 0usize;

    for entry in WalkDir::new(path).min_depth(1).contents_first(true) {
      let entry = entry.map_err(|source| SourceError::Walk {
        path: path.to_path_buf(),
        source,
      })?;
      let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
      if self.is_kept(relative) {
        continue;
      }

      let remove_error = |source| SourceError::Remove {
        path: entry.path().to_path_buf(),
        source,
      };

      if entry.file_type().is_dir() {
        // Directories holding kept files stay in place.
        let is_empty = fs::read_dir(entry.path()).map_err(remove_error)?.next().is_none();
        if is_empty {
          fs::remove_dir(entry.path()).map_err(remove_error)?;
          removed += 1;
        }
      } else {
        fs::remove_file(entry.path()).map_err(remove_error)?;
        removed += 1;
      }
    }

    debug!(path = %path.display(), removed, "cleared source entries");
    info!(path = %path.display(), kept_patterns = self.keep.len(), "removed application source");
    Ok(())
  }
}
