//! Ability catalog loader.

use std::path::Path;

use arena_core::SpawnDescriptor;
use serde::{Deserialize, Serialize};

use crate::catalog::AbilityCatalog;
use crate::loaders::{LoadResult, read_file};

const EMBEDDED: &str = include_str!("../../data/abilities.ron");

/// Ability catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AbilityCatalogRon {
    abilities: Vec<SpawnDescriptor>,
}

/// Loader for the ability catalog from RON files.
pub struct AbilityLoader;

impl AbilityLoader {
    /// Load an ability catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<AbilityCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load abilities from {}: {}", path.display(), e))
    }

    /// The catalog shipped in `data/abilities.ron`.
    pub fn embedded() -> LoadResult<AbilityCatalog> {
        Self::parse(EMBEDDED)
    }

    /// Parses a catalog. Duplicate ability keys are rejected.
    pub fn parse(content: &str) -> LoadResult<AbilityCatalog> {
        let data: AbilityCatalogRon = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse ability catalog RON: {}", e))?;

        let mut catalog = AbilityCatalog::new();
        for descriptor in data.abilities {
            let key = descriptor.key.clone();
            if catalog.insert(descriptor).is_some() {
                anyhow::bail!("Duplicate ability '{}' in catalog", key);
            }
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use arena_core::{AbilityFactory, AbilityKey, AbilityKind, ArenaConfig, TargetFilter};

    use super::*;

    #[test]
    fn embedded_catalog_is_clean() {
        let catalog = AbilityLoader::embedded().unwrap();
        assert!(!catalog.is_empty());
        let issues = catalog.audit(ArenaConfig::default().min_secs());
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn embedded_catalog_covers_every_kind() {
        let catalog = AbilityLoader::embedded().unwrap();
        let has = |pred: fn(&AbilityKind) -> bool| catalog.iter().any(|d| pred(&d.kind));
        assert!(has(|k| matches!(k, AbilityKind::Projectile(_))));
        assert!(has(|k| matches!(k, AbilityKind::AreaScan(_))));
        assert!(has(|k| matches!(k, AbilityKind::PureBuff(_))));
        assert!(has(|k| matches!(k, AbilityKind::Scripted(_))));
    }

    #[test]
    fn optional_fields_take_defaults() {
        let catalog = AbilityLoader::parse(
            r#"(
                abilities: [
                    (
                        key: "spark",
                        kind: Projectile((speed: 30.0, collision_radius: 0.2)),
                        damage: 12.0,
                        lifetime_secs: Some(2.0),
                    ),
                ],
            )"#,
        )
        .unwrap();

        let spark = catalog.resolve(&AbilityKey::from("spark")).unwrap();
        let AbilityKind::Projectile(params) = &spark.kind else {
            panic!("spark is not a projectile");
        };
        assert!(!params.penetrates);
        assert_eq!(params.targets, TargetFilter::ENEMIES);
        assert_eq!(spark.mana_cost, 0.0);
        assert!(spark.ranks.is_empty());
    }

    #[test]
    fn target_filters_parse_from_flag_names() {
        let catalog = AbilityLoader::parse(
            r#"(
                abilities: [
                    (
                        key: "rally",
                        kind: PureBuff((
                            radius: 6.0,
                            buffs: [(stat: Armor, magnitude: 5.0, duration_secs: 3.0)],
                            targets: "ALLIES | SELF",
                        )),
                        lifetime_secs: None,
                    ),
                ],
            )"#,
        )
        .unwrap();

        let rally = catalog.resolve(&AbilityKey::from("rally")).unwrap();
        let AbilityKind::PureBuff(params) = &rally.kind else {
            panic!("rally is not a pure buff");
        };
        assert_eq!(params.targets, TargetFilter::ALLIES | TargetFilter::SELF);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result = AbilityLoader::parse(
            r#"(
                abilities: [
                    (
                        key: "spark",
                        kind: Projectile((speed: 30.0, collision_radius: 0.2)),
                        lifetime_secs: None,
                    ),
                    (
                        key: "spark",
                        kind: Projectile((speed: 10.0, collision_radius: 0.2)),
                        lifetime_secs: None,
                    ),
                ],
            )"#,
        );
        assert!(result.is_err());
    }
}
