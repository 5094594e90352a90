use glam::Vec3;

use crate::ability::{AbilityKey, DestroyReason};
use crate::error::CastError;
use crate::state::{EntityId, StatKind};

/// Observable effects of one peer's simulation, drained by the host each tick.
///
/// Events describe what this peer saw happen; they are never sent over the
/// wire. Mirrors and authoritative copies emit the same variants.
#[derive(Clone, Debug, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(name(CombatEventKind), derive(strum::Display, Hash))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatEvent {
    AbilitySpawned {
        ability: EntityId,
        caster: EntityId,
        key: AbilityKey,
    },
    Impact {
        ability: EntityId,
        target: Option<EntityId>,
        point: Vec3,
    },
    /// Emitted by the master after mitigation.
    Damaged {
        target: EntityId,
        source: EntityId,
        amount: f32,
        health: f32,
    },
    Healed {
        target: EntityId,
        amount: f32,
        health: f32,
    },
    /// A `HealthUpdate` was applied on a non-master peer.
    HealthChanged {
        hero: EntityId,
        health: f32,
        is_dead: bool,
    },
    Died {
        hero: EntityId,
        killer: Option<EntityId>,
    },
    Respawned {
        hero: EntityId,
    },
    BuffApplied {
        target: EntityId,
        stat: StatKind,
        source: EntityId,
        value: f32,
    },
    BuffExpired {
        target: EntityId,
        stat: StatKind,
        source: EntityId,
        restored: f32,
    },
    AbilityDestroyed {
        ability: EntityId,
        reason: DestroyReason,
    },
    CastRejected {
        caster: EntityId,
        key: AbilityKey,
        error: CastError,
    },
}

impl CombatEvent {
    pub fn kind(&self) -> CombatEventKind {
        CombatEventKind::from(self)
    }
}
