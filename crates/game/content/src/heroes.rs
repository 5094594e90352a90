//! Hero templates: base stats and starting ability ranks.

use std::collections::BTreeMap;

use arena_core::{AbilityKey, EntityId, Hero, PeerId, StatBlock, Team};
use glam::Vec3;

/// Blueprint of a playable hero.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeroTemplate {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default = "default_level"))]
    pub level: u8,
    pub stats: StatBlock,
    /// Abilities the hero can cast, with the rank each starts at.
    #[cfg_attr(feature = "serde", serde(default))]
    pub abilities: Vec<(AbilityKey, u8)>,
}

#[cfg(feature = "serde")]
fn default_level() -> u8 {
    1
}

impl HeroTemplate {
    /// Builds a live hero at full health and mana.
    pub fn spawn(&self, id: EntityId, owner: PeerId, team: Team, position: Vec3) -> Hero {
        self.abilities.iter().fold(
            Hero::new(id, owner, team, self.stats.clone(), position).with_level(self.level),
            |hero, (ability, rank)| hero.with_rank(ability.clone(), *rank),
        )
    }

    pub fn knows(&self, ability: &AbilityKey) -> bool {
        self.abilities.iter().any(|(key, _)| key == ability)
    }
}

/// Hero templates keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeroRoster {
    templates: BTreeMap<String, HeroTemplate>,
}

impl HeroRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: HeroTemplate) -> Option<HeroTemplate> {
        self.templates.insert(template.name.clone(), template)
    }

    pub fn get(&self, name: &str) -> Option<&HeroTemplate> {
        self.templates.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_hero_carries_template_ranks() {
        let template = HeroTemplate {
            name: "warden".into(),
            level: 3,
            stats: StatBlock::default(),
            abilities: vec![(AbilityKey::from("arrow"), 2)],
        };
        let hero = template.spawn(EntityId::hero(1), PeerId(1), Team::Red, Vec3::ZERO);

        assert_eq!(hero.level, 3);
        assert_eq!(hero.rank_of(&AbilityKey::from("arrow")), 2);
        assert_eq!(hero.health(), StatBlock::default().max_health);
        assert!(template.knows(&AbilityKey::from("arrow")));
        assert!(!template.knows(&AbilityKey::from("haste")));
    }
}
