//! The build orchestrator.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::types::{BuildContext, BuildError, BuildResult};
use crate::cache;
use crate::checksum::ChecksumCalculator;
use crate::clock::Clock;
use crate::compile::{BuildProcess, GoBuildConfiguration};
use crate::config::{self, BuildConfiguration, ConfigurationParser};
use crate::consts::{GOCACHE_LAYER_NAME, TARGETS_BIN_DIR, TARGETS_LAYER_NAME};
use crate::launch::{self, Process};
use crate::layer::{Layer, LayerError, LayerFlags, Layers, TargetsMetadata};
use crate::sbom::{self, SbomFormat, SbomGenerator};
use crate::source::SourceRemover;
use crate::workspace::{GoPaths, PathError, PathManager};

/// Runs builds against a fixed set of collaborators.
pub struct Build<'a> {
  parser: &'a dyn ConfigurationParser,
  process: &'a dyn BuildProcess,
  checksum: &'a dyn ChecksumCalculator,
  paths: &'a dyn PathManager,
  clock: &'a dyn Clock,
  source: &'a dyn SourceRemover,
  sbom: &'a dyn SbomGenerator,
}

/// The two layers a build manages, plus what the targets layer recorded
/// before it was reset.
struct BuildLayers {
  targets: Layer,
  gocache: Layer,
  previous: Option<TargetsMetadata>,
}

impl<'a> Build<'a> {
  pub fn new(
    parser: &'a dyn ConfigurationParser,
    process: &'a dyn BuildProcess,
    checksum: &'a dyn ChecksumCalculator,
    paths: &'a dyn PathManager,
    clock: &'a dyn Clock,
    source: &'a dyn SourceRemover,
    sbom: &'a dyn SbomGenerator,
  ) -> Self {
    Self {
      parser,
      process,
      checksum,
      paths,
      clock,
      source,
      sbom,
    }
  }

  /// Run one build.
  ///
  /// Once GOPATH setup succeeds, teardown runs exactly once whatever happens
  /// afterwards. A teardown failure fails an otherwise successful build; when
  /// an earlier step already failed, that error wins and the teardown failure
  /// is logged.
  pub fn run(&self, context: &BuildContext) -> Result<BuildResult, BuildError> {
    info!("{} {}", context.buildpack.name, context.buildpack.version);

    let layers = Layers::new(&context.layers_dir);
    let mut build_layers = load_layers(&layers)?;

    let sbom_formats = sbom::parse_formats(&context.buildpack.sbom_formats)?;

    let configuration = self.parser.parse(&context.buildpack.version, &context.working_dir)?;

    let paths = self.paths.setup(&context.working_dir, &configuration.import_path)?;
    let teardown = Teardown::new(self.paths, paths.go_path.clone());

    let outcome = self.realize(context, &configuration, &paths, &sbom_formats, &mut build_layers);
    let torn_down = teardown.finish();

    let processes = match (outcome, torn_down) {
      (Ok(processes), Ok(())) => processes,
      (Ok(_), Err(e)) => return Err(e.into()),
      (Err(e), Ok(())) => return Err(e),
      (Err(e), Err(teardown_error)) => {
        warn!(error = %teardown_error, "GOPATH teardown failed after an earlier build failure");
        return Err(e);
      }
    };

    let BuildLayers { targets, gocache, .. } = build_layers;
    layers
      .persist(&targets)
      .map_err(BuildError::persist(TARGETS_LAYER_NAME))?;
    layers
      .persist(&gocache)
      .map_err(BuildError::persist(GOCACHE_LAYER_NAME))?;

    Ok(BuildResult {
      layers: vec![targets, gocache],
      processes,
    })
  }

  /// Everything between GOPATH setup and teardown.
  fn realize(
    &self,
    context: &BuildContext,
    configuration: &BuildConfiguration,
    paths: &GoPaths,
    sbom_formats: &[SbomFormat],
    layers: &mut BuildLayers,
  ) -> Result<Vec<Process>, BuildError> {
    let checksum = self.checksum.sum(configuration, &context.working_dir)?;
    let decision = cache::evaluate(&checksum, layers.previous.as_ref(), self.clock);
    if decision.reused {
      info!(checksum = %checksum, "build intent unchanged since last build");
    }

    let targets = &mut layers.targets;
    targets.reset().map_err(BuildError::prepare(TARGETS_LAYER_NAME))?;
    targets.flags = LayerFlags::launch_only();
    targets
      .set_targets_metadata(&decision.metadata)
      .map_err(BuildError::prepare(TARGETS_LAYER_NAME))?;
    let output = targets.path.join(TARGETS_BIN_DIR);
    ensure_dir(&output).map_err(BuildError::prepare(TARGETS_LAYER_NAME))?;

    let gocache = &mut layers.gocache;
    gocache.flags = LayerFlags::cache_only();
    ensure_dir(&gocache.path).map_err(BuildError::prepare(GOCACHE_LAYER_NAME))?;

    let go_build = GoBuildConfiguration {
      workspace: paths.app_path.clone(),
      output: output.clone(),
      go_path: paths.go_path.clone(),
      go_cache: gocache.path.clone(),
      flags: configuration.flags.clone(),
      targets: configuration.targets.clone(),
    };

    info!("Executing build process");
    let binaries = self.process.execute(&go_build)?;
    debug!(?binaries, "build process produced binaries");

    let live_reload = config::live_reload_enabled()?;
    let processes = launch::assemble(&binaries, &context.working_dir, &context.stack, live_reload)?;

    info!("Assigning launch processes:");
    for line in launch::describe(&processes) {
      info!("  {}", line);
    }

    sbom::attach(self.sbom, sbom_formats, &output, &mut layers.targets)?;

    self.source.clear(&context.working_dir)?;

    Ok(processes)
  }
}

fn load_layers(layers: &Layers) -> Result<BuildLayers, BuildError> {
  let targets = layers
    .get(TARGETS_LAYER_NAME)
    .map_err(BuildError::metadata(TARGETS_LAYER_NAME))?;
  let previous = targets
    .targets_metadata()
    .map_err(BuildError::metadata(TARGETS_LAYER_NAME))?;
  let gocache = layers
    .get(GOCACHE_LAYER_NAME)
    .map_err(BuildError::metadata(GOCACHE_LAYER_NAME))?;

  Ok(BuildLayers {
    targets,
    gocache,
    previous,
  })
}

fn ensure_dir(path: &Path) -> Result<(), LayerError> {
  fs::create_dir_all(path).map_err(|source| LayerError::Write {
    path: path.to_path_buf(),
    source,
  })
}

/// Tears the GOPATH down exactly once: explicitly through `finish`, or on
/// drop while unwinding out of a build step.
struct Teardown<'a> {
  manager: &'a dyn PathManager,
  go_path: Option<PathBuf>,
  pending: bool,
}

impl<'a> Teardown<'a> {
  fn new(manager: &'a dyn PathManager, go_path: Option<PathBuf>) -> Self {
    Self {
      manager,
      go_path,
      pending: true,
    }
  }

  fn finish(mut self) -> Result<(), PathError> {
    self.pending = false;
    self.manager.teardown(self.go_path.as_deref())
  }
}

impl Drop for Teardown<'_> {
  fn drop(&mut self) {
    if !self.pending {
      return;
    }
    self.pending = false;
    if let Err(e) = self.manager.teardown(self.go_path.as_deref()) {
      warn!(error = %e, "GOPATH teardown failed while unwinding");
    }
  }
}
