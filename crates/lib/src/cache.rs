//! Checksum cache gate.
//!
//! Decides whether the targets layer's recorded `built_at` still describes
//! the current build intent. The compiler runs on every build regardless;
//! only the timestamp is gated.

use tracing::debug;

use crate::clock::Clock;
use crate::layer::TargetsMetadata;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDecision {
  /// Metadata to record on the targets layer for this build.
  pub metadata: TargetsMetadata,
  /// True when the previous `built_at` was carried forward.
  pub reused: bool,
}

/// Compare a fresh checksum against the previously recorded metadata.
///
/// On a match the previous `built_at` is returned untouched and the clock is
/// not consulted. Otherwise the clock is read exactly once.
pub fn evaluate(checksum: &str, previous: Option<&TargetsMetadata>, clock: &dyn Clock) -> CacheDecision {
  if let Some(previous) = previous
    && previous.cache_sha == checksum
  {
    debug!(checksum, built_at = %previous.built_at, "build intent unchanged, reusing timestamp");
    return CacheDecision {
      metadata: previous.clone(),
      reused: true,
    };
  }

  let built_at = clock.now();
  debug!(checksum, %built_at, "build intent changed");
  CacheDecision {
    metadata: TargetsMetadata {
      cache_sha: checksum.to_string(),
      built_at,
    },
    reused: false,
  }
}
