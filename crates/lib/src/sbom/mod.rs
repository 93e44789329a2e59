//! Software bill of materials for compiled targets.
//!
//! Requested formats are validated up front with [`parse_formats`]. After
//! compilation, [`attach`] runs the generator once over the binary directory
//! and renders the resulting document into every requested format.
//!
//! # Submodules
//!
//! - [`generate`] - `SbomGenerator` and the directory-scanning generator
//! - `render` - format-specific JSON rendering

pub mod generate;
mod render;
mod types;

use std::path::Path;

use tracing::info;

use crate::layer::Layer;

pub use generate::{DirectorySbomGenerator, SbomGenerator};
pub use types::*;

/// Validate requested media types, preserving order.
pub fn parse_formats<S: AsRef<str>>(requested: &[S]) -> Result<Vec<SbomFormat>, SbomError> {
  requested.iter().map(|format| format.as_ref().parse()).collect()
}

/// Generate an SBOM for `dir` and attach one rendering per format to `layer`.
pub fn attach(
  generator: &dyn SbomGenerator,
  formats: &[SbomFormat],
  dir: &Path,
  layer: &mut Layer,
) -> Result<(), SbomError> {
  info!(dir = %dir.display(), "generating SBOM");
  let document = generator.generate(dir)?;
  layer.sbom = document.in_formats(formats)?;
  info!(
    artifacts = document.artifacts.len(),
    formats = ?formats.iter().map(SbomFormat::media_type).collect::<Vec<_>>(),
    "attached SBOM to layer {}",
    layer.name
  );
  Ok(())
}
