//! GOPATH coordination.
//!
//! Module-aware projects build in place. Projects without a `go.mod` but with
//! an import path are linked into a temporary GOPATH so the toolchain can
//! resolve them, and that GOPATH is removed again on teardown.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Paths returned by [`PathManager::setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoPaths {
  /// Temporary GOPATH, `None` in module mode.
  pub go_path: Option<PathBuf>,
  /// Directory the compiler runs in.
  pub app_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum PathError {
  #[error("failed to create GOPATH: {0}")]
  CreateGoPath(#[source] io::Error),

  #[error("failed to link {workspace} into GOPATH at {link}: {source}")]
  Link {
    workspace: PathBuf,
    link: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid import path \"{0}\": must be relative and stay inside GOPATH")]
  InvalidImportPath(String),

  #[error("failed to remove GOPATH {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

pub trait PathManager {
  fn setup(&self, workspace: &Path, import_path: &str) -> Result<GoPaths, PathError>;
  fn teardown(&self, go_path: Option<&Path>) -> Result<(), PathError>;
}

#[derive(Debug, Clone, Default)]
pub struct GoPathManager {
  temp_root: Option<PathBuf>,
}

impl GoPathManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create temporary GOPATHs under `root` instead of the system temp dir.
  pub fn with_temp_root(root: impl Into<PathBuf>) -> Self {
    Self {
      temp_root: Some(root.into()),
    }
  }
}

impl PathManager for GoPathManager {
  fn setup(&self, workspace: &Path, import_path: &str) -> Result<GoPaths, PathError> {
    if import_path.is_empty() || workspace.join("go.mod").exists() {
      debug!(workspace = %workspace.display(), "module mode, building in place");
      return Ok(GoPaths {
        go_path: None,
        app_path: workspace.to_path_buf(),
      });
    }

    let import = Path::new(import_path);
    if import.is_absolute() || import.components().any(|c| !matches!(c, Component::Normal(_))) {
      return Err(PathError::InvalidImportPath(import_path.to_string()));
    }

    let builder = {
      let mut builder = tempfile::Builder::new();
      builder.prefix("gopath");
      builder
    };
    let temp = match &self.temp_root {
      Some(root) => builder.tempdir_in(root),
      None => builder.tempdir(),
    }
    .map_err(PathError::CreateGoPath)?;

    let app_path = temp.path().join("src").join(import);
    if let Some(parent) = app_path.parent() {
      fs::create_dir_all(parent).map_err(PathError::CreateGoPath)?;
    }
    link_dir(workspace, &app_path).map_err(|source| PathError::Link {
      workspace: workspace.to_path_buf(),
      link: app_path.clone(),
      source,
    })?;

    // Ownership passes to teardown only once the GOPATH is complete.
    let go_path = temp.keep();
    let app_path = go_path.join("src").join(import);

    info!(go_path = %go_path.display(), import_path, "created temporary GOPATH");
    Ok(GoPaths {
      go_path: Some(go_path),
      app_path,
    })
  }

  fn teardown(&self, go_path: Option<&Path>) -> Result<(), PathError> {
    let Some(go_path) = go_path else {
      return Ok(());
    };

    fs::remove_dir_all(go_path).map_err(|source| PathError::Remove {
      path: go_path.to_path_buf(),
      source,
    })?;
    debug!(go_path = %go_path.display(), "removed temporary GOPATH");
    Ok(())
  }
}

#[cfg(unix)]
fn link_dir(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn link_dir(target: &Path, link: &Path) -> io::Result<()> {
  std::os::windows::fs::symlink_dir(target, link)
}
