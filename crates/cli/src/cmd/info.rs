use anyhow::Result;

use gobuild_lib::config::{
  BUILD_FLAGS_ENV, IMPORT_PATH_ENV, KEEP_FILES_ENV, LDFLAGS_ENV, LIVE_RELOAD_ENV, TARGETS_ENV,
};
use gobuild_lib::sbom::SbomFormat;

use crate::output::{self, OutputFormat, print_info, print_json};

const ENVIRONMENT: [(&str, &str); 6] = [
  (TARGETS_ENV, "colon-separated packages to build, default \".\""),
  (BUILD_FLAGS_ENV, "extra go build flags"),
  (LDFLAGS_ENV, "value passed as -ldflags"),
  (IMPORT_PATH_ENV, "import path for projects without go.mod"),
  (KEEP_FILES_ENV, "colon-separated globs of source files to keep"),
  (LIVE_RELOAD_ENV, "add watchexec reload processes"),
];

pub fn cmd_info(format: OutputFormat) -> Result<()> {
  if format.is_json() {
    let formats: Vec<_> = SbomFormat::ALL
      .iter()
      .map(|f| serde_json::json!({ "media_type": f.media_type(), "extension": f.extension() }))
      .collect();
    let environment: Vec<_> = ENVIRONMENT
      .iter()
      .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
      .collect();
    return print_json(&serde_json::json!({ "sbom_formats": formats, "environment": environment }));
  }

  print_info(&format!("gobuild {}", env!("CARGO_PKG_VERSION")));
  println!();
  println!("SBOM formats:");
  for sbom in SbomFormat::ALL {
    println!("  {} {} (.{})", output::symbols::INFO, sbom.media_type(), sbom.extension());
  }
  println!();
  println!("Environment:");
  for (name, description) in ENVIRONMENT {
    println!("  {} {:<24} {}", output::symbols::INFO, name, description);
  }
  Ok(())
}
