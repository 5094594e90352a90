//! Content loaders for reading arena data from files.
//!
//! Every loader offers `load` (from a path), `parse` (from a string) and
//! `embedded` (the defaults compiled into the crate from `data/`).

pub mod abilities;
pub mod config;
pub mod factory;
pub mod heroes;

pub use abilities::AbilityLoader;
pub use config::ConfigLoader;
pub use factory::{Content, ContentFactory};
pub use heroes::HeroLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
