use std::collections::BTreeMap;
use std::time::Duration;

use super::mitigation::{apply_damage, mitigate};
use super::request::{DamageRequest, HealRequest, ManaSpend, RequestKey};
use crate::error::CombatError;
use crate::state::{EntityId, Hero, LifeState, Vitals};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageOutcome {
    pub target: EntityId,
    pub mitigated: f32,
    pub vitals: Vitals,
    /// The request moved the target from alive to dead.
    pub killed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealOutcome {
    pub target: EntityId,
    pub healed: f32,
    pub vitals: Vitals,
}

/// Single writer of hero health and mana. Only the master peer runs one.
///
/// Requests are keyed so a duplicated delivery is recognised and dropped;
/// keys are forgotten once they fall out of the dedupe window.
#[derive(Debug, Default)]
pub struct CombatAuthority {
    processed: BTreeMap<RequestKey, Duration>,
    spent: BTreeMap<EntityId, Duration>,
}

impl CombatAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a damage request to `hero`.
    ///
    /// # Errors
    ///
    /// [`CombatError::AlreadyProcessed`] for a duplicate key or a target that
    /// is already dead. Neither changes any state.
    pub fn apply_damage(
        &mut self,
        hero: &mut Hero,
        request: &DamageRequest,
        now: Duration,
    ) -> Result<DamageOutcome, CombatError> {
        self.check_fresh(request.key)?;
        if hero.is_dead() {
            return Err(CombatError::AlreadyProcessed {
                entity: hero.id,
                what: "damage on dead target",
            });
        }
        self.processed.insert(request.key, now);

        let mitigated = mitigate(request.amount, hero.stats.resistance(request.is_magic));
        let health = apply_damage(hero.health(), mitigated);
        let revision = hero.bump_revision();
        hero.set_vitals(health, hero.mana(), revision);

        let killed = hero.health() <= 0.0;
        if killed {
            hero.set_life(LifeState::Dead { since: now });
        }
        Ok(DamageOutcome {
            target: hero.id,
            mitigated,
            vitals: hero.vitals(),
            killed,
        })
    }

    /// Applies a heal request. Heals are never mitigated.
    ///
    /// # Errors
    ///
    /// [`CombatError::AlreadyProcessed`] for a duplicate key or a dead target.
    pub fn apply_heal(
        &mut self,
        hero: &mut Hero,
        request: &HealRequest,
        now: Duration,
    ) -> Result<HealOutcome, CombatError> {
        self.check_fresh(request.key)?;
        if hero.is_dead() {
            return Err(CombatError::AlreadyProcessed {
                entity: hero.id,
                what: "heal on dead target",
            });
        }
        self.processed.insert(request.key, now);

        let before = hero.health();
        let revision = hero.bump_revision();
        hero.set_vitals(before + request.amount.max(0.0), hero.mana(), revision);
        Ok(HealOutcome {
            target: hero.id,
            healed: hero.health() - before,
            vitals: hero.vitals(),
        })
    }

    /// Deducts mana paid for a cast, flooring at zero.
    ///
    /// # Errors
    ///
    /// [`CombatError::AlreadyProcessed`] when this instance was already paid for.
    pub fn spend_mana(
        &mut self,
        hero: &mut Hero,
        spend: &ManaSpend,
        now: Duration,
    ) -> Result<Vitals, CombatError> {
        if self.spent.contains_key(&spend.instance) {
            return Err(CombatError::AlreadyProcessed {
                entity: spend.instance,
                what: "mana spend",
            });
        }
        self.spent.insert(spend.instance, now);

        let revision = hero.bump_revision();
        hero.set_vitals(hero.health(), hero.mana() - spend.amount.max(0.0), revision);
        Ok(hero.vitals())
    }

    /// Regenerates health and mana over `dt`. Returns whether anything changed.
    /// The revision is left alone; it is bumped when the change is broadcast.
    pub fn regenerate(&self, hero: &mut Hero, dt: Duration) -> bool {
        if hero.is_dead() {
            return false;
        }
        let secs = dt.as_secs_f32();
        let before = hero.vitals();
        hero.set_vitals(
            before.health + hero.stats.health_regen * secs,
            before.mana + hero.stats.mana_regen * secs,
            before.revision,
        );
        hero.vitals() != before
    }

    /// Brings a dead hero back at its spawn point with full resources.
    pub fn respawn(&self, hero: &mut Hero) -> Option<Vitals> {
        if !hero.is_dead() {
            return None;
        }
        let revision = hero.bump_revision();
        hero.set_life(LifeState::Alive);
        hero.set_vitals(hero.stats.max_health, hero.stats.max_mana, revision);
        hero.kinematics = crate::state::Kinematics::at(hero.spawn_point);
        Some(hero.vitals())
    }

    /// Forgets request keys processed before `cutoff`.
    pub fn prune(&mut self, cutoff: Duration) {
        self.processed.retain(|_, at| *at >= cutoff);
        self.spent.retain(|_, at| *at >= cutoff);
    }

    pub fn remembered(&self) -> usize {
        self.processed.len() + self.spent.len()
    }

    pub fn clear(&mut self) {
        self.processed.clear();
        self.spent.clear();
    }

    fn check_fresh(&self, key: RequestKey) -> Result<(), CombatError> {
        if self.processed.contains_key(&key) {
            return Err(CombatError::AlreadyProcessed {
                entity: key.target,
                what: "request",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::state::{PeerId, StatBlock, Team};

    const TARGET: EntityId = EntityId(2);
    const SOURCE: EntityId = EntityId(50);

    fn hero(armor: f32) -> Hero {
        let stats = StatBlock {
            armor,
            ..StatBlock::default()
        };
        Hero::new(TARGET, PeerId(2), Team::Blue, stats, Vec3::ZERO)
    }

    fn damage(amount: f32, ordinal: u32) -> DamageRequest {
        DamageRequest {
            key: RequestKey {
                source: SOURCE,
                target: TARGET,
                ordinal,
            },
            target: TARGET,
            amount,
            source: SOURCE,
            attacker: EntityId(1),
            is_magic: false,
        }
    }

    #[test]
    fn physical_damage_uses_armor() {
        let mut authority = CombatAuthority::new();
        let mut target = hero(100.0);
        let outcome = authority
            .apply_damage(&mut target, &damage(100.0, 0), Duration::ZERO)
            .expect("damage");
        assert_eq!(outcome.mitigated, 50.0);
        assert_eq!(target.health(), 450.0);
        assert_eq!(target.vitals().revision, 1);
    }

    #[test]
    fn duplicate_key_is_dropped() {
        let mut authority = CombatAuthority::new();
        let mut target = hero(0.0);
        authority
            .apply_damage(&mut target, &damage(100.0, 0), Duration::ZERO)
            .expect("first");
        let err = authority
            .apply_damage(&mut target, &damage(100.0, 0), Duration::ZERO)
            .expect_err("duplicate");
        assert!(matches!(err, CombatError::AlreadyProcessed { .. }));
        assert_eq!(target.health(), 400.0);
    }

    #[test]
    fn dead_target_is_never_hit_again() {
        let mut authority = CombatAuthority::new();
        let mut target = hero(0.0);
        let outcome = authority
            .apply_damage(&mut target, &damage(10_000.0, 0), Duration::ZERO)
            .expect("lethal");
        assert!(outcome.killed);
        assert!(target.is_dead());
        let revision = target.vitals().revision;

        for ordinal in 1..5 {
            assert!(
                authority
                    .apply_damage(&mut target, &damage(10.0, ordinal), Duration::ZERO)
                    .is_err()
            );
        }
        assert_eq!(target.health(), 0.0);
        assert_eq!(target.vitals().revision, revision);
    }

    #[test]
    fn respawn_restores_full_resources() {
        let authority = CombatAuthority::new();
        let mut target = hero(0.0);
        target.set_vitals(0.0, 0.0, 4);
        target.set_life(LifeState::Dead {
            since: Duration::ZERO,
        });
        let vitals = authority.respawn(&mut target).expect("was dead");
        assert_eq!(vitals.health, target.stats.max_health);
        assert_eq!(vitals.revision, 5);
        assert!(authority.respawn(&mut target).is_none());
    }

    #[test]
    fn pruned_keys_are_accepted_again() {
        let mut authority = CombatAuthority::new();
        let mut target = hero(0.0);
        authority
            .apply_damage(&mut target, &damage(1.0, 0), Duration::from_secs(1))
            .expect("first");
        authority.prune(Duration::from_secs(2));
        assert_eq!(authority.remembered(), 0);
    }
}
