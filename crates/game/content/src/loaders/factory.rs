//! Content factory for loading a full content set from a data directory.

use std::path::PathBuf;

use arena_core::ArenaConfig;

use crate::catalog::AbilityCatalog;
use crate::heroes::HeroRoster;
use crate::loaders::{AbilityLoader, ConfigLoader, HeroLoader, LoadResult};

/// Everything a peer needs before the first tick of a match.
#[derive(Clone, Debug)]
pub struct Content {
    pub config: ArenaConfig,
    pub abilities: AbilityCatalog,
    pub heroes: HeroRoster,
}

impl Content {
    /// The content compiled into this crate.
    pub fn embedded() -> LoadResult<Self> {
        Ok(Self {
            config: ConfigLoader::embedded()?,
            abilities: AbilityLoader::embedded()?,
            heroes: HeroLoader::embedded()?,
        })
    }
}

/// Content factory that loads all arena content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── arena.toml
/// ├── abilities.ron
/// └── heroes.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load arena configuration from `arena.toml`.
    pub fn load_config(&self) -> LoadResult<ArenaConfig> {
        ConfigLoader::load(&self.data_dir.join("arena.toml"))
    }

    /// Load the ability catalog from `abilities.ron`.
    pub fn load_abilities(&self) -> LoadResult<AbilityCatalog> {
        AbilityLoader::load(&self.data_dir.join("abilities.ron"))
    }

    /// Load hero templates from `heroes.ron`.
    pub fn load_heroes(&self) -> LoadResult<HeroRoster> {
        HeroLoader::load(&self.data_dir.join("heroes.ron"))
    }

    /// Loads every file and checks that heroes only reference cataloged
    /// abilities.
    pub fn load(&self) -> LoadResult<Content> {
        let content = Content {
            config: self.load_config()?,
            abilities: self.load_abilities()?,
            heroes: self.load_heroes()?,
        };
        for name in content.heroes.names() {
            let Some(template) = content.heroes.get(name) else {
                continue;
            };
            for (ability, _) in &template.abilities {
                anyhow::ensure!(
                    content.abilities.contains(ability),
                    "Hero '{}' references unknown ability '{}'",
                    name,
                    ability
                );
            }
        }
        Ok(content)
    }
}
