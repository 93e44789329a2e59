//! Per-format JSON rendering.
//!
//! Renderings contain no timestamps or random identifiers so the same
//! document always produces byte-identical output.

use serde_json::{Value, json};

use super::types::{FormattedSbom, SbomDocument, SbomError, SbomFormat};
use crate::consts::APP_NAME;
use crate::util::hash::hash_bytes;

const CYCLONEDX_SPEC_VERSION: &str = "1.3";
const SPDX_VERSION: &str = "SPDX-2.2";
const SYFT_SCHEMA_VERSION: &str = "16.0.0";

impl SbomDocument {
  pub fn in_formats(&self, formats: &[SbomFormat]) -> Result<Vec<FormattedSbom>, SbomError> {
    formats
      .iter()
      .map(|&format| {
        Ok(FormattedSbom {
          format,
          content: self.render(format)?,
        })
      })
      .collect()
  }

  pub fn render(&self, format: SbomFormat) -> Result<String, SbomError> {
    let value = match format {
      SbomFormat::CycloneDx => self.cyclonedx(),
      SbomFormat::Spdx => self.spdx(),
      SbomFormat::Syft => self.syft(),
    };
    serde_json::to_string_pretty(&value).map_err(|source| SbomError::Render { format, source })
  }

  fn cyclonedx(&self) -> Value {
    let components: Vec<Value> = self
      .artifacts
      .iter()
      .map(|artifact| {
        json!({
          "type": "file",
          "name": artifact.name,
          "hashes": [{ "alg": "SHA-256", "content": artifact.sha256 }],
          "properties": [{ "name": "path", "value": artifact.path }],
        })
      })
      .collect();

    json!({
      "bomFormat": "CycloneDX",
      "specVersion": CYCLONEDX_SPEC_VERSION,
      "version": 1,
      "metadata": {
        "tools": [{ "name": APP_NAME, "version": env!("CARGO_PKG_VERSION") }],
        "component": { "type": "application", "name": self.source },
      },
      "components": components,
    })
  }

  fn spdx(&self) -> Value {
    let files: Vec<Value> = self
      .artifacts
      .iter()
      .enumerate()
      .map(|(index, artifact)| {
        json!({
          "fileName": format!("./{}", artifact.path),
          "SPDXID": format!("SPDXRef-File-{}", index),
          "checksums": [{ "algorithm": "SHA256", "checksumValue": artifact.sha256 }],
          "licenseConcluded": "NOASSERTION",
          "copyrightText": "NOASSERTION",
        })
      })
      .collect();

    json!({
      "spdxVersion": SPDX_VERSION,
      "dataLicense": "CC0-1.0",
      "SPDXID": "SPDXRef-DOCUMENT",
      "name": self.source,
      "documentNamespace": format!("https://{}.invalid/spdx/{}", APP_NAME, self.fingerprint()),
      "creationInfo": { "creators": [format!("Tool: {}-{}", APP_NAME, env!("CARGO_PKG_VERSION"))] },
      "files": files,
    })
  }

  fn syft(&self) -> Value {
    let artifacts: Vec<Value> = self
      .artifacts
      .iter()
      .map(|artifact| {
        json!({
          "id": artifact.sha256.chars().take(16).collect::<String>(),
          "name": artifact.name,
          "type": "binary",
          "locations": [{ "path": artifact.path }],
          "metadata": {
            "size": artifact.size,
            "digests": [{ "algorithm": "sha256", "value": artifact.sha256 }],
          },
        })
      })
      .collect();

    json!({
      "artifacts": artifacts,
      "source": { "type": "directory", "target": self.source },
      "descriptor": { "name": APP_NAME, "version": env!("CARGO_PKG_VERSION") },
      "schema": { "version": SYFT_SCHEMA_VERSION },
    })
  }

  /// Stable identifier derived from the artifact digests.
  fn fingerprint(&self) -> String {
    let joined: Vec<&str> = self.artifacts.iter().map(|a| a.sha256.as_str()).collect();
    hash_bytes(joined.join("\n").as_bytes()).0
  }
}
