//! Names and identifiers shared across the crate.

pub const APP_NAME: &str = "gobuild";

/// Layer holding the compiled binaries shipped into the runtime image.
pub const TARGETS_LAYER_NAME: &str = "targets";

/// Layer holding the Go build cache, persisted between builds.
pub const GOCACHE_LAYER_NAME: &str = "gocache";

/// Subdirectory of the targets layer that receives compiled binaries.
pub const TARGETS_BIN_DIR: &str = "bin";

/// Reduced runtime stack that ships without `watchexec`.
pub const TINY_STACK_ID: &str = "io.paketo.stacks.tiny";

/// Watch-and-restart executable used by live-reload processes.
pub const WATCHEXEC: &str = "watchexec";

pub const RELOAD_PROCESS_PREFIX: &str = "reload-";
