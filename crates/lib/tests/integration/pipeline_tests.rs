//! Builds driven through the concrete collaborators, with only the Go
//! toolchain replaced.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use serial_test::serial;
use tempfile::TempDir;

use gobuild_lib::build::{Build, BuildContext, BuildpackInfo};
use gobuild_lib::checksum::Sha256ChecksumCalculator;
use gobuild_lib::clock::FixedClock;
use gobuild_lib::compile::{BuildProcess, CompileError, GoBuildConfiguration};
use gobuild_lib::config::EnvConfigurationParser;
use gobuild_lib::sbom::DirectorySbomGenerator;
use gobuild_lib::source::SourceDeleter;
use gobuild_lib::workspace::GoPathManager;

/// Writes one binary per build and notes whether the app path existed.
#[derive(Default)]
struct WritingBuildProcess {
  seen: RefCell<Vec<(GoBuildConfiguration, bool)>>,
}

impl BuildProcess for WritingBuildProcess {
  fn execute(&self, config: &GoBuildConfiguration) -> Result<Vec<PathBuf>, CompileError> {
    self
      .seen
      .borrow_mut()
      .push((config.clone(), config.workspace.join("main.go").exists()));

    let binary = config.output.join("app");
    fs::write(&binary, "binary").map_err(|source| CompileError::CreateOutput {
      path: binary.clone(),
      source,
    })?;
    Ok(vec![binary])
  }
}

fn go_env<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
  let mut all: Vec<(&str, Option<&str>)> = vec![
    ("BP_GO_TARGETS", None),
    ("BP_GO_BUILD_FLAGS", None),
    ("BP_GO_BUILD_LDFLAGS", None),
    ("BP_GO_BUILD_IMPORT_PATH", None),
    ("BP_KEEP_FILES", None),
    ("BP_LIVE_RELOAD_ENABLED", None),
  ];
  for (key, value) in vars {
    all.retain(|(k, _)| k != key);
    all.push((*key, *value));
  }
  temp_env::with_vars(all, f)
}

fn app_source(root: &Path, with_go_mod: bool) {
  fs::create_dir_all(root.join("assets")).unwrap();
  fs::write(root.join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
  fs::write(root.join("assets/logo.svg"), "<svg/>").unwrap();
  if with_go_mod {
    fs::write(root.join("go.mod"), "module example.com/app\n").unwrap();
  }
}

fn context(working_dir: &Path, layers_dir: &Path) -> BuildContext {
  BuildContext {
    working_dir: working_dir.to_path_buf(),
    layers_dir: layers_dir.to_path_buf(),
    stack: "io.buildpacks.stacks.bionic".to_string(),
    buildpack: BuildpackInfo {
      name: "Go Build".to_string(),
      version: "1.2.3".to_string(),
      sbom_formats: vec!["application/vnd.cyclonedx+json".to_string()],
    },
  }
}

#[test]
#[serial]
fn module_build_keeps_only_matching_files() {
  let temp = TempDir::new().unwrap();
  let working_dir = temp.path().join("workspace");
  let layers_dir = temp.path().join("layers");
  app_source(&working_dir, true);

  let process = WritingBuildProcess::default();
  let clock = FixedClock(Utc.with_ymd_and_hms(2022, 3, 4, 5, 6, 7).unwrap());

  let result = go_env(&[("BP_KEEP_FILES", Some("assets/*"))], || {
    let parser = EnvConfigurationParser::new();
    let checksum = Sha256ChecksumCalculator::new();
    let paths = GoPathManager::new();
    let source = SourceDeleter::from_env().unwrap();
    let sbom = DirectorySbomGenerator::new();
    Build::new(&parser, &process, &checksum, &paths, &clock, &source, &sbom).run(&context(&working_dir, &layers_dir))
  })
  .unwrap();

  let seen = process.seen.borrow();
  let (config, app_present) = &seen[0];
  assert!(app_present);
  assert_eq!(config.workspace, working_dir);
  assert_eq!(config.go_path, None);
  assert_eq!(config.targets, vec!["."]);
  assert_eq!(config.flags, vec!["-buildmode=pie", "-trimpath"]);

  assert!(!working_dir.join("main.go").exists());
  assert!(!working_dir.join("go.mod").exists());
  assert!(working_dir.join("assets/logo.svg").exists());

  assert!(layers_dir.join("targets/bin/app").exists());
  assert_eq!(result.processes[0].command, layers_dir.join("targets/bin/app").to_string_lossy());

  let cdx = fs::read_to_string(layers_dir.join("targets.sbom.cdx.json")).unwrap();
  let cdx: serde_json::Value = serde_json::from_str(&cdx).unwrap();
  assert_eq!(cdx["bomFormat"], "CycloneDX");
  assert_eq!(cdx["components"][0]["name"], "app");
}

#[test]
#[serial]
fn unchanged_workspace_reuses_built_at() {
  let temp = TempDir::new().unwrap();
  let working_dir = temp.path().join("workspace");
  let layers_dir = temp.path().join("layers");
  app_source(&working_dir, true);

  let first = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
  let second = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

  let run = |at| {
    go_env(&[("BP_KEEP_FILES", Some("*"))], || {
      let process = WritingBuildProcess::default();
      let clock = FixedClock(at);
      let parser = EnvConfigurationParser::new();
      let checksum = Sha256ChecksumCalculator::new();
      let paths = GoPathManager::new();
      let source = SourceDeleter::from_env().unwrap();
      let sbom = DirectorySbomGenerator::new();
      Build::new(&parser, &process, &checksum, &paths, &clock, &source, &sbom).run(&context(&working_dir, &layers_dir))
    })
    .unwrap()
  };

  let before = run(first).layer("targets").unwrap().targets_metadata().unwrap().unwrap();
  let after = run(second).layer("targets").unwrap().targets_metadata().unwrap().unwrap();

  assert_eq!(before.built_at, first);
  assert_eq!(after, before);

  fs::write(working_dir.join("main.go"), "package main\n\nfunc main() { println() }\n").unwrap();
  let changed = run(second).layer("targets").unwrap().targets_metadata().unwrap().unwrap();
  assert_eq!(changed.built_at, second);
  assert_ne!(changed.cache_sha, before.cache_sha);
}

#[test]
#[serial]
fn gopath_build_links_workspace_and_removes_gopath() {
  let temp = TempDir::new().unwrap();
  let working_dir = temp.path().join("workspace");
  let layers_dir = temp.path().join("layers");
  let gopath_root = temp.path().join("tmp");
  fs::create_dir_all(&gopath_root).unwrap();
  app_source(&working_dir, false);

  let process = WritingBuildProcess::default();
  let clock = FixedClock(Utc.with_ymd_and_hms(2022, 3, 4, 5, 6, 7).unwrap());

  go_env(&[("BP_GO_BUILD_IMPORT_PATH", Some("example.com/app"))], || {
    let parser = EnvConfigurationParser::new();
    let checksum = Sha256ChecksumCalculator::new();
    let paths = GoPathManager::with_temp_root(&gopath_root);
    let source = SourceDeleter::from_env().unwrap();
    let sbom = DirectorySbomGenerator::new();
    Build::new(&parser, &process, &checksum, &paths, &clock, &source, &sbom).run(&context(&working_dir, &layers_dir))
  })
  .unwrap();

  let seen = process.seen.borrow();
  let (config, app_present) = &seen[0];
  let go_path = config.go_path.clone().unwrap();
  assert!(app_present, "workspace should be reachable through GOPATH");
  assert_eq!(config.workspace, go_path.join("src").join("example.com/app"));
  assert!(go_path.starts_with(&gopath_root));

  assert!(!go_path.exists());
  assert_eq!(fs::read_dir(&gopath_root).unwrap().count(), 0);
  assert!(working_dir.exists());
}
