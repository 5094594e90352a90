//! Hero template loader.

use std::path::Path;

use crate::heroes::{HeroRoster, HeroTemplate};
use crate::loaders::{LoadResult, read_file};

const EMBEDDED: &str = include_str!("../../data/heroes.ron");

/// Loader for hero templates from RON files.
///
/// RON format: `Vec<HeroTemplate>`
pub struct HeroLoader;

impl HeroLoader {
    pub fn load(path: &Path) -> LoadResult<HeroRoster> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load heroes from {}: {}", path.display(), e))
    }

    /// The roster shipped in `data/heroes.ron`.
    pub fn embedded() -> LoadResult<HeroRoster> {
        Self::parse(EMBEDDED)
    }

    pub fn parse(content: &str) -> LoadResult<HeroRoster> {
        let templates: Vec<HeroTemplate> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse hero RON: {}", e))?;

        let mut roster = HeroRoster::new();
        for template in templates {
            anyhow::ensure!(
                template.stats.max_health > 0.0,
                "Hero '{}' must have positive max_health",
                template.name
            );
            let name = template.name.clone();
            if roster.insert(template).is_some() {
                anyhow::bail!("Duplicate hero '{}'", name);
            }
        }
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use crate::loaders::AbilityLoader;

    use super::*;

    #[test]
    fn embedded_heroes_only_know_cataloged_abilities() {
        let roster = HeroLoader::embedded().unwrap();
        let catalog = AbilityLoader::embedded().unwrap();
        assert!(roster.len() >= 2);
        for name in roster.names() {
            let template = roster.get(name).unwrap();
            for (ability, _) in &template.abilities {
                assert!(catalog.contains(ability), "{name} knows unknown {ability}");
            }
        }
    }

    #[test]
    fn zero_health_template_is_rejected() {
        let result = HeroLoader::parse(
            r#"[
                (
                    name: "ghost",
                    stats: (
                        max_health: 0.0,
                        max_mana: 100.0,
                        damage: 10.0,
                        attack_speed: 1.0,
                        move_speed: 8.0,
                        armor: 0.0,
                        magic_resist: 0.0,
                        health_regen: 0.0,
                        mana_regen: 0.0,
                    ),
                ),
            ]"#,
        );
        assert!(result.is_err());
    }
}
