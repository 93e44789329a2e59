//! gobuild-lib: build orchestration for Go application images
//!
//! This crate turns a Go source tree into launchable binaries inside a
//! buildpack layer layout:
//! - `build`: the orchestrator tying every stage together
//! - `cache`: reuses the previous build timestamp when the build intent is unchanged
//! - `workspace`: temporary GOPATH setup and teardown
//! - `compile`: drives the Go toolchain
//! - `launch`: assembles start commands, including live-reload variants
//! - `sbom`: generates and attaches software bills of materials

pub mod build;
pub mod cache;
pub mod checksum;
pub mod clock;
pub mod compile;
pub mod config;
pub mod consts;
pub mod launch;
pub mod layer;
pub mod sbom;
pub mod source;
pub mod util;
pub mod workspace;
