use crate::ability::AbilityKey;
use crate::state::EntityId;

/// Idempotence key of a damage or heal request.
///
/// `ordinal` counts impacts within the source ability, so a penetrating
/// projectile or a re-triggering area produces a distinct key per hit while
/// a duplicated delivery of the same hit does not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestKey {
    pub source: EntityId,
    pub target: EntityId,
    pub ordinal: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageRequest {
    pub key: RequestKey,
    pub target: EntityId,
    pub amount: f32,
    /// Ability instance that produced the hit.
    pub source: EntityId,
    /// Hero credited with a kill.
    pub attacker: EntityId,
    pub is_magic: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealRequest {
    pub key: RequestKey,
    pub target: EntityId,
    pub amount: f32,
    pub source: EntityId,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManaSpend {
    pub hero: EntityId,
    pub amount: f32,
    pub ability: AbilityKey,
    /// Ability instance the mana paid for; doubles as the idempotence key.
    pub instance: EntityId,
}
