//! Implementation of the `gobuild build` command.
//!
//! Wires the concrete collaborators into a build, runs it against the given
//! working directory and layers root, and prints what was produced.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gobuild_lib::build::{Build, BuildContext, BuildResult, BuildpackInfo};
use gobuild_lib::checksum::Sha256ChecksumCalculator;
use gobuild_lib::clock::SystemClock;
use gobuild_lib::compile::GoBuildProcess;
use gobuild_lib::config::EnvConfigurationParser;
use gobuild_lib::sbom::DirectorySbomGenerator;
use gobuild_lib::source::SourceDeleter;
use gobuild_lib::workspace::GoPathManager;

use crate::output::{self, OutputFormat, print_error, print_json, print_stat, print_success, truncate_hash};

#[derive(Args, Debug)]
pub struct BuildArgs {
  /// Application source directory
  #[arg(long, default_value = ".")]
  pub working_dir: PathBuf,

  /// Layers root the targets and gocache layers live under
  #[arg(long, env = "CNB_LAYERS_DIR")]
  pub layers: PathBuf,

  /// Stack identifier of the image being built
  #[arg(long, env = "CNB_STACK_ID")]
  pub stack: String,

  /// Buildpack name shown in the build log
  #[arg(long, default_value = "Go Build")]
  pub buildpack_name: String,

  /// Buildpack version shown in the build log
  #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
  pub buildpack_version: String,

  /// SBOM media type to attach (repeatable)
  #[arg(long = "sbom-format")]
  pub sbom_formats: Vec<String>,

  /// Go toolchain binary
  #[arg(long, default_value = "go")]
  pub go: PathBuf,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

pub fn cmd_build(args: BuildArgs) -> Result<()> {
  let working_dir = args
    .working_dir
    .canonicalize()
    .with_context(|| format!("Working directory not found: {}", args.working_dir.display()))?;

  let parser = EnvConfigurationParser::new();
  let process = GoBuildProcess::with_toolchain(&args.go);
  let checksum = Sha256ChecksumCalculator::new();
  let paths = GoPathManager::new();
  let clock = SystemClock;
  let source = SourceDeleter::from_env().context("Failed to read keep-file patterns")?;
  let sbom = DirectorySbomGenerator::new();

  let context = BuildContext {
    working_dir,
    layers_dir: args.layers,
    stack: args.stack,
    buildpack: BuildpackInfo {
      name: args.buildpack_name,
      version: args.buildpack_version,
      sbom_formats: args.sbom_formats,
    },
  };

  let build = Build::new(&parser, &process, &checksum, &paths, &clock, &source, &sbom);
  let result = match build.run(&context) {
    Ok(result) => result,
    Err(e) => {
      print_error(&format!("Build failed: {}", e));
      return Err(e.into());
    }
  };

  if args.output.is_json() {
    print_json(&summary_json(&result))?;
  } else {
    print_summary(&result)?;
  }

  Ok(())
}

fn summary_json(result: &BuildResult) -> serde_json::Value {
  let layers: Vec<_> = result
    .layers
    .iter()
    .map(|layer| {
      serde_json::json!({
        "name": layer.name,
        "path": layer.path,
        "launch": layer.flags.launch,
        "build": layer.flags.build,
        "cache": layer.flags.cache,
        "metadata": layer.metadata,
        "sbom": layer.sbom.iter().map(|s| s.format.media_type()).collect::<Vec<_>>(),
      })
    })
    .collect();

  serde_json::json!({ "layers": layers, "processes": result.processes })
}

fn print_summary(result: &BuildResult) -> Result<()> {
  print_success("Build complete");

  for layer in &result.layers {
    println!();
    println!("Layer {}:", layer.name);
    print_stat("Path", &layer.path.display().to_string());
    if let Some(metadata) = layer.targets_metadata()? {
      print_stat("Checksum", truncate_hash(&metadata.cache_sha));
      print_stat("Built at", &metadata.built_at.to_rfc3339());
    }
    for sbom in &layer.sbom {
      print_stat("SBOM", sbom.format.media_type());
    }
  }

  if !result.processes.is_empty() {
    println!();
    println!("Processes:");
    for process in &result.processes {
      let marker = if process.default { " (default)" } else { "" };
      println!(
        "  {} {}{} {} {}",
        output::symbols::ARROW,
        process.process_type,
        marker,
        process.command,
        process.args.join(" ")
      );
    }
  }

  Ok(())
}
