//! Data-driven arena content and loaders for RON/TOML data files:
//! - Ability catalog (data-driven via RON)
//! - Hero templates (data-driven via RON)
//! - Match configuration (data-driven via TOML)
//!
//! Content feeds the simulation through [`arena_core::AbilityFactory`] and
//! hero constructors. None of it is replicated: every peer loads the same
//! files and only ability keys cross the wire.

pub mod catalog;
pub mod heroes;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use catalog::AbilityCatalog;
pub use heroes::{HeroRoster, HeroTemplate};

#[cfg(feature = "loaders")]
pub use loaders::{AbilityLoader, ConfigLoader, Content, ContentFactory, HeroLoader, LoadResult};
