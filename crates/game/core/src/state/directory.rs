use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::Duration;

use super::{EntityId, Hero, PeerId};
use crate::ability::AbilityInstance;

pub type HeroTable = BTreeMap<EntityId, Hero>;
pub type AbilityTable = BTreeMap<EntityId, AbilityInstance>;

/// Session-scoped registry of live combat entities.
///
/// Everything that crosses the wire refers to entities by [`EntityId`] and is
/// resolved here. Removed ability ids leave a tombstone so a late
/// `CreateAbilityInstance` or snapshot cannot bring them back. Impacts that
/// overtake their ability's creation are held by ordinal until it arrives.
#[derive(Debug)]
pub struct EntityDirectory {
    local: PeerId,
    next_local: u64,
    heroes: HeroTable,
    abilities: AbilityTable,
    /// Removed ability ids and the sim time of removal.
    tombstones: BTreeMap<EntityId, Duration>,
    /// (ability, ordinal) of impacts seen before the ability, with the hit
    /// target and the sim time they arrived.
    early_impacts: BTreeMap<(EntityId, u32), (Option<EntityId>, Duration)>,
}

impl EntityDirectory {
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            next_local: 1,
            heroes: BTreeMap::new(),
            abilities: BTreeMap::new(),
            tombstones: BTreeMap::new(),
            early_impacts: BTreeMap::new(),
        }
    }

    /// Mints a fresh id in the local peer's namespace. Never reused.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::compose(self.local, self.next_local);
        self.next_local += 1;
        id
    }

    pub fn insert_hero(&mut self, hero: Hero) -> Option<Hero> {
        self.heroes.insert(hero.id, hero)
    }

    pub fn hero(&self, id: EntityId) -> Option<&Hero> {
        self.heroes.get(&id)
    }

    pub fn hero_mut(&mut self, id: EntityId) -> Option<&mut Hero> {
        self.heroes.get_mut(&id)
    }

    pub fn heroes(&self) -> impl Iterator<Item = &Hero> {
        self.heroes.values()
    }

    pub fn ability(&self, id: EntityId) -> Option<&AbilityInstance> {
        self.abilities.get(&id)
    }

    pub fn ability_mut(&mut self, id: EntityId) -> Option<&mut AbilityInstance> {
        self.abilities.get_mut(&id)
    }

    pub fn abilities(&self) -> impl Iterator<Item = &AbilityInstance> {
        self.abilities.values()
    }

    pub fn ability_ids(&self) -> Vec<EntityId> {
        self.abilities.keys().copied().collect()
    }

    pub fn ability_count(&self) -> usize {
        self.abilities.len()
    }

    /// Registers an ability instance. Refused when the id is live or tombstoned.
    pub fn insert_ability(&mut self, instance: AbilityInstance) -> bool {
        if self.tombstones.contains_key(&instance.id) || self.abilities.contains_key(&instance.id)
        {
            return false;
        }
        self.abilities.insert(instance.id, instance);
        true
    }

    /// Removes an ability and tombstones its id. Returns `None` when it was
    /// already gone, so concurrent destroy paths observe exactly one removal.
    pub fn remove_ability(&mut self, id: EntityId, now: Duration) -> Option<AbilityInstance> {
        let removed = self.abilities.remove(&id)?;
        self.tombstone(id, now);
        Some(removed)
    }

    /// Marks `id` as destroyed whether or not it was ever registered here.
    pub fn tombstone(&mut self, id: EntityId, now: Duration) {
        self.tombstones.insert(id, now);
        self.early_impacts.retain(|(ability, _), _| *ability != id);
    }

    pub fn is_tombstoned(&self, id: EntityId) -> bool {
        self.tombstones.contains_key(&id)
    }

    /// Holds an impact on an ability not registered yet. Returns `false` if
    /// the same ordinal is already held.
    pub fn hold_early_impact(
        &mut self,
        ability: EntityId,
        ordinal: u32,
        target: Option<EntityId>,
        now: Duration,
    ) -> bool {
        match self.early_impacts.entry((ability, ordinal)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert((target, now));
                true
            }
        }
    }

    /// Releases the impacts held for `ability` as (ordinal, target) pairs.
    pub fn take_early_impacts(&mut self, ability: EntityId) -> Vec<(u32, Option<EntityId>)> {
        let held: Vec<(EntityId, u32)> = self
            .early_impacts
            .range((ability, 0)..=(ability, u32::MAX))
            .map(|(key, _)| *key)
            .collect();
        held.into_iter()
            .filter_map(|key| {
                self.early_impacts
                    .remove(&key)
                    .map(|(target, _)| (key.1, target))
            })
            .collect()
    }

    /// Drops tombstones and held impacts recorded before `cutoff`.
    pub fn prune(&mut self, cutoff: Duration) {
        self.tombstones.retain(|_, removed_at| *removed_at >= cutoff);
        self.early_impacts.retain(|_, (_, seen_at)| *seen_at >= cutoff);
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.heroes.contains_key(&id) || self.abilities.contains_key(&id)
    }

    /// Splits the directory so an ability can tick while mutating heroes.
    pub fn parts_mut(&mut self) -> (&mut HeroTable, &mut AbilityTable) {
        (&mut self.heroes, &mut self.abilities)
    }

    pub(crate) fn heroes_mut(&mut self) -> &mut HeroTable {
        &mut self.heroes
    }

    /// Ends the session: every entity and tombstone is dropped.
    pub fn clear(&mut self) {
        self.heroes.clear();
        self.abilities.clear();
        self.tombstones.clear();
        self.early_impacts.clear();
    }
}
