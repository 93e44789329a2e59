//! Build orchestration.
//!
//! A build runs the whole protocol for one working directory:
//!
//! 1. load the `targets` and `gocache` layers and validate the SBOM formats
//! 2. parse the build configuration
//! 3. set up the GOPATH (teardown is guaranteed from here on)
//! 4. checksum the build intent and gate the `built_at` timestamp
//! 5. compile
//! 6. resolve live reload and assemble launch processes
//! 7. attach the SBOM to the targets layer
//! 8. remove the application source
//! 9. tear down the GOPATH and persist the layers
//!
//! Any failure aborts the build; no partial result is returned.
//!
//! # Submodules
//!
//! - [`execute`] - the `Build` orchestrator

pub mod execute;
mod types;

pub use execute::Build;
pub use types::*;
