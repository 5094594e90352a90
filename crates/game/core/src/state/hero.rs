//! Player-controlled combat unit.
//!
//! Health and mana are split-authority data: they are written only through
//! [`crate::combat`] (on the master peer) or by applying the master's
//! broadcast. The setters are therefore crate-private.

use std::collections::BTreeMap;
use std::time::Duration;

use glam::Vec3;

use super::{EntityId, PeerId, StatBlock, Team};
use crate::ability::AbilityKey;
use crate::replication::Interpolator;

/// Continuous movement state, streamed by the hero's owning peer.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Kinematics {
    pub position: Vec3,
    pub direction: Vec3,
    pub moving: bool,
    pub speed: f32,
}

impl Kinematics {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            direction: Vec3::X,
            moving: false,
            speed: 0.0,
        }
    }
}

/// Life cycle of a hero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LifeState {
    Alive,
    Dead { since: Duration },
}

/// Authoritative resource values plus the master's revision counter.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vitals {
    pub health: f32,
    pub mana: f32,
    pub revision: u32,
}

#[derive(Clone, Debug)]
pub struct Hero {
    pub id: EntityId,
    /// Peer that drives this hero's input and movement.
    pub owner: PeerId,
    pub team: Team,
    pub level: u8,
    pub kinematics: Kinematics,
    pub spawn_point: Vec3,
    pub stats: StatBlock,
    vitals: Vitals,
    life: LifeState,
    ability_ranks: BTreeMap<AbilityKey, u8>,
    /// Sim time at which each ability becomes castable again.
    cooldowns: BTreeMap<AbilityKey, Duration>,
    pub(crate) mirror: Option<Interpolator>,
}

impl Hero {
    /// Creates a living hero at full health and mana.
    pub fn new(id: EntityId, owner: PeerId, team: Team, stats: StatBlock, position: Vec3) -> Self {
        let vitals = Vitals {
            health: stats.max_health,
            mana: stats.max_mana,
            revision: 0,
        };
        Self {
            id,
            owner,
            team,
            level: 1,
            kinematics: Kinematics::at(position),
            spawn_point: position,
            stats,
            vitals,
            life: LifeState::Alive,
            ability_ranks: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            mirror: None,
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn with_rank(mut self, ability: impl Into<AbilityKey>, rank: u8) -> Self {
        self.ability_ranks.insert(ability.into(), rank);
        self
    }

    #[inline]
    pub fn health(&self) -> f32 {
        self.vitals.health
    }

    #[inline]
    pub fn mana(&self) -> f32 {
        self.vitals.mana
    }

    #[inline]
    pub fn vitals(&self) -> Vitals {
        self.vitals
    }

    #[inline]
    pub fn life(&self) -> LifeState {
        self.life
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        matches!(self.life, LifeState::Dead { .. })
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.kinematics.position
    }

    /// Current rank of an ability; unranked abilities cast at rank 1.
    pub fn rank_of(&self, ability: &AbilityKey) -> u8 {
        self.ability_ranks.get(ability).copied().unwrap_or(1)
    }

    pub fn set_rank(&mut self, ability: AbilityKey, rank: u8) {
        self.ability_ranks.insert(ability, rank);
    }

    /// Remaining cooldown of an ability at `now`, if any.
    pub fn cooldown_remaining(&self, ability: &AbilityKey, now: Duration) -> Option<Duration> {
        self.cooldowns
            .get(ability)
            .and_then(|ready_at| ready_at.checked_sub(now))
            .filter(|remaining| !remaining.is_zero())
    }

    pub(crate) fn start_cooldown(&mut self, ability: AbilityKey, ready_at: Duration) {
        self.cooldowns.insert(ability, ready_at);
    }

    pub(crate) fn clear_cooldowns(&mut self) {
        self.cooldowns.clear();
    }

    /// Writes authoritative vitals. Health is clamped to `[0, max_health]`.
    pub(crate) fn set_vitals(&mut self, health: f32, mana: f32, revision: u32) {
        self.vitals = Vitals {
            health: health.clamp(0.0, self.stats.max_health),
            mana: mana.clamp(0.0, self.stats.max_mana),
            revision,
        };
    }

    pub(crate) fn set_life(&mut self, life: LifeState) {
        self.life = life;
    }

    pub(crate) fn bump_revision(&mut self) -> u32 {
        self.vitals.revision = self.vitals.revision.wrapping_add(1);
        self.vitals.revision
    }
}
