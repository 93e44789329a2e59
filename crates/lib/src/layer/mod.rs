//! Buildpack layers.
//!
//! A layer is a directory under the layers root plus a `<name>.toml` file
//! recording its visibility flags and free-form metadata:
//!
//! ```text
//! {layers}/
//! ├── targets/            # compiled binaries (launch)
//! ├── targets.toml
//! ├── targets.sbom.cdx.json
//! ├── gocache/            # Go build cache (cache)
//! └── gocache.toml
//! ```

mod store;
mod types;

pub use store::Layers;
pub use types::*;
