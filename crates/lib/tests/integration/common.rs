//! Recording fakes for the build collaborators.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use gobuild_lib::build::{Build, BuildContext, BuildpackInfo};
use gobuild_lib::checksum::{ChecksumCalculator, ChecksumError};
use gobuild_lib::clock::FixedClock;
use gobuild_lib::compile::{BuildProcess, CompileError, GoBuildConfiguration};
use gobuild_lib::config::{BuildConfiguration, ConfigError, ConfigurationParser};
use gobuild_lib::sbom::{SbomArtifact, SbomDocument, SbomError, SbomGenerator};
use gobuild_lib::source::{SourceError, SourceRemover};
use gobuild_lib::util::hash::HashError;
use gobuild_lib::workspace::{GoPaths, PathError, PathManager};

pub fn built_at() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2021, 6, 15, 12, 30, 0).unwrap()
}

pub struct FakeParser {
  pub configuration: BuildConfiguration,
  pub fail: bool,
  pub calls: RefCell<Vec<(String, PathBuf)>>,
}

impl ConfigurationParser for FakeParser {
  fn parse(&self, buildpack_version: &str, working_dir: &Path) -> Result<BuildConfiguration, ConfigError> {
    self
      .calls
      .borrow_mut()
      .push((buildpack_version.to_string(), working_dir.to_path_buf()));
    if self.fail {
      return Err(ConfigError::NoMatchingTargets("./missing".to_string()));
    }
    Ok(self.configuration.clone())
  }
}

pub struct FakeBuildProcess {
  pub binaries: Vec<PathBuf>,
  pub fail: bool,
  pub panic: bool,
  pub calls: RefCell<Vec<GoBuildConfiguration>>,
}

impl BuildProcess for FakeBuildProcess {
  fn execute(&self, config: &GoBuildConfiguration) -> Result<Vec<PathBuf>, CompileError> {
    self.calls.borrow_mut().push(config.clone());
    if self.panic {
      panic!("compiler crashed");
    }
    if self.fail {
      return Err(CompileError::Failed {
        cmd: "go build".to_string(),
        code: Some(1),
        stderr: "failed to execute build process".to_string(),
      });
    }
    Ok(self.binaries.clone())
  }
}

pub struct FakeChecksum {
  pub sum: String,
  pub fail: bool,
  pub calls: RefCell<Vec<(BuildConfiguration, PathBuf)>>,
}

impl ChecksumCalculator for FakeChecksum {
  fn sum(&self, configuration: &BuildConfiguration, working_dir: &Path) -> Result<String, ChecksumError> {
    self
      .calls
      .borrow_mut()
      .push((configuration.clone(), working_dir.to_path_buf()));
    if self.fail {
      return Err(ChecksumError::Workspace(HashError::ReadFile {
        path: working_dir.join("main.go"),
        source: io::Error::other("failed to calculate checksum"),
      }));
    }
    Ok(self.sum.clone())
  }
}

pub struct FakePaths {
  pub paths: GoPaths,
  pub fail_setup: bool,
  pub fail_teardown: bool,
  pub setup_calls: RefCell<Vec<(PathBuf, String)>>,
  pub teardown_calls: RefCell<Vec<Option<PathBuf>>>,
}

impl PathManager for FakePaths {
  fn setup(&self, workspace: &Path, import_path: &str) -> Result<GoPaths, PathError> {
    self
      .setup_calls
      .borrow_mut()
      .push((workspace.to_path_buf(), import_path.to_string()));
    if self.fail_setup {
      return Err(PathError::CreateGoPath(io::Error::other("failed to setup paths")));
    }
    Ok(self.paths.clone())
  }

  fn teardown(&self, go_path: Option<&Path>) -> Result<(), PathError> {
    self.teardown_calls.borrow_mut().push(go_path.map(Path::to_path_buf));
    if self.fail_teardown {
      return Err(PathError::Remove {
        path: go_path.map(Path::to_path_buf).unwrap_or_default(),
        source: io::Error::other("failed to teardown paths"),
      });
    }
    Ok(())
  }
}

pub struct FakeSource {
  pub fail: bool,
  pub calls: RefCell<Vec<PathBuf>>,
}

impl SourceRemover for FakeSource {
  fn clear(&self, path: &Path) -> Result<(), SourceError> {
    self.calls.borrow_mut().push(path.to_path_buf());
    if self.fail {
      return Err(SourceError::Remove {
        path: path.to_path_buf(),
        source: io::Error::other("failed to remove source"),
      });
    }
    Ok(())
  }
}

pub struct FakeSbom {
  pub document: SbomDocument,
  pub fail: bool,
  pub calls: RefCell<Vec<PathBuf>>,
}

impl SbomGenerator for FakeSbom {
  fn generate(&self, dir: &Path) -> Result<SbomDocument, SbomError> {
    self.calls.borrow_mut().push(dir.to_path_buf());
    if self.fail {
      return Err(SbomError::Digest(HashError::ReadFile {
        path: dir.join("app"),
        source: io::Error::other("failed to generate SBOM"),
      }));
    }
    Ok(self.document.clone())
  }
}

/// A workspace and layers root plus one fake per collaborator.
pub struct Harness {
  _temp: TempDir,
  pub working_dir: PathBuf,
  pub layers_dir: PathBuf,
  pub stack: String,
  pub sbom_formats: Vec<String>,
  pub parser: FakeParser,
  pub process: FakeBuildProcess,
  pub checksum: FakeChecksum,
  pub paths: FakePaths,
  pub clock: FixedClock,
  pub source: FakeSource,
  pub sbom: FakeSbom,
}

impl Harness {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let working_dir = temp.path().join("working-dir");
    let layers_dir = temp.path().join("layers");
    std::fs::create_dir_all(&working_dir).unwrap();
    std::fs::create_dir_all(&layers_dir).unwrap();

    Self {
      parser: FakeParser {
        configuration: BuildConfiguration {
          targets: vec!["./some-target".to_string(), "./other-target".to_string()],
          flags: vec!["-buildmode=pie".to_string(), "-trimpath".to_string()],
          import_path: "some-import-path".to_string(),
        },
        fail: false,
        calls: RefCell::new(Vec::new()),
      },
      process: FakeBuildProcess {
        binaries: vec![
          PathBuf::from("path/some-start-command"),
          PathBuf::from("path/another-start-command"),
        ],
        fail: false,
        panic: false,
        calls: RefCell::new(Vec::new()),
      },
      checksum: FakeChecksum {
        sum: "some-checksum".to_string(),
        fail: false,
        calls: RefCell::new(Vec::new()),
      },
      paths: FakePaths {
        paths: GoPaths {
          go_path: Some(PathBuf::from("some-go-path")),
          app_path: PathBuf::from("some-app-path"),
        },
        fail_setup: false,
        fail_teardown: false,
        setup_calls: RefCell::new(Vec::new()),
        teardown_calls: RefCell::new(Vec::new()),
      },
      clock: FixedClock(built_at()),
      source: FakeSource {
        fail: false,
        calls: RefCell::new(Vec::new()),
      },
      sbom: FakeSbom {
        document: SbomDocument {
          source: "bin".to_string(),
          artifacts: vec![SbomArtifact {
            name: "some-start-command".to_string(),
            path: "some-start-command".to_string(),
            size: 4,
            sha256: "abc123".to_string(),
          }],
        },
        fail: false,
        calls: RefCell::new(Vec::new()),
      },
      stack: "some-stack".to_string(),
      sbom_formats: vec![
        "application/vnd.cyclonedx+json".to_string(),
        "application/spdx+json".to_string(),
        "application/vnd.syft+json".to_string(),
      ],
      working_dir,
      layers_dir,
      _temp: temp,
    }
  }

  pub fn build(&self) -> Build<'_> {
    Build::new(
      &self.parser,
      &self.process,
      &self.checksum,
      &self.paths,
      &self.clock,
      &self.source,
      &self.sbom,
    )
  }

  pub fn context(&self) -> BuildContext {
    BuildContext {
      working_dir: self.working_dir.clone(),
      layers_dir: self.layers_dir.clone(),
      stack: self.stack.clone(),
      buildpack: BuildpackInfo {
        name: "Some Buildpack".to_string(),
        version: "some-version".to_string(),
        sbom_formats: self.sbom_formats.clone(),
      },
    }
  }

  pub fn write_layer_file(&self, name: &str, content: &str) {
    std::fs::write(self.layers_dir.join(format!("{}.toml", name)), content).unwrap();
  }

  pub fn teardown_count(&self) -> usize {
    self.paths.teardown_calls.borrow().len()
  }
}
