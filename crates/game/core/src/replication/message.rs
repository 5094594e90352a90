use std::time::Duration;

use glam::Vec3;

use crate::ability::{AbilityConfig, CrowdControl, SpawnTransform};
use crate::buffs::{BuffKey, BuffRecord};
use crate::combat::{DamageRequest, HealRequest, ManaSpend};
use crate::state::{EntityId, Kinematics, PeerId, StatKind, Team};

/// Who should receive an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeliveryTarget {
    /// Every peer, the sender included.
    All,
    AllExceptSender,
    Master,
    Peer(PeerId),
}

/// A message and its routing.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub from: PeerId,
    pub target: DeliveryTarget,
    pub message: Message,
}

impl Envelope {
    /// Whether `peer` is a recipient, given the session's master.
    pub fn addresses(&self, peer: PeerId, master: PeerId) -> bool {
        match self.target {
            DeliveryTarget::All => true,
            DeliveryTarget::AllExceptSender => peer != self.from,
            DeliveryTarget::Master => peer == master,
            DeliveryTarget::Peer(to) => peer == to,
        }
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::from(&self.message)
    }
}

/// Every message exchanged between peers.
#[derive(Clone, Debug, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(
    name(MessageKind),
    derive(strum::Display, strum::EnumIter, Hash, PartialOrd, Ord)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    CreateAbilityInstance(CreateAbility),
    AbilitySnapshot(AbilitySnapshot),
    AbilityImpact(AbilityImpact),
    DestroyAbilityInstance(DestroyAbility),
    RequestDamage(DamageRequest),
    RequestHeal(HealRequest),
    RequestManaSpend(ManaSpend),
    HealthUpdate(HealthUpdate),
    BuffApply(BuffApply),
    BuffExpire(BuffExpire),
    HeroSnapshot(HeroSnapshot),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreateAbility {
    pub ability: EntityId,
    pub caster: EntityId,
    pub owner: PeerId,
    pub team: Team,
    pub config: AbilityConfig,
    pub transform: SpawnTransform,
}

/// Discrete and continuous counters of an ability, version-specific per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityCounters {
    pub impacts: u32,
    pub penetrations: u32,
    /// Current radius of area abilities; zero otherwise.
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilitySnapshot {
    pub ability: EntityId,
    /// Per-entity sequence; receivers drop anything not newer than the last applied.
    pub seq: u32,
    pub elapsed: Duration,
    pub kinematics: Kinematics,
    pub counters: AbilityCounters,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityImpact {
    pub ability: EntityId,
    /// Position of this impact in the ability's impact sequence.
    pub ordinal: u32,
    /// `None` for world geometry.
    pub target: Option<EntityId>,
    pub point: Vec3,
    pub normal: Vec3,
    pub crowd_control: Option<CrowdControl>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DestroyAbility {
    pub ability: EntityId,
}

/// Authoritative vitals of one hero, issued only by the master.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthUpdate {
    pub target: EntityId,
    pub health: f32,
    pub mana: f32,
    pub is_dead: bool,
    pub revision: u32,
    pub killer: Option<EntityId>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuffApply {
    pub target: EntityId,
    pub stat: StatKind,
    pub source: EntityId,
    pub magnitude: f32,
    pub is_percentage: bool,
    pub original: f32,
    /// Time left on the record. Peer clocks are not shared, so end times are
    /// sent relative and re-anchored by the receiver.
    pub remaining: Duration,
    pub serial: u32,
}

impl BuffApply {
    pub fn from_record(record: &BuffRecord, now: Duration) -> Self {
        Self {
            target: record.target,
            stat: record.stat,
            source: record.source,
            magnitude: record.magnitude,
            is_percentage: record.is_percentage,
            original: record.original,
            remaining: record.end_time.saturating_sub(now),
            serial: record.serial,
        }
    }

    pub fn into_record(self, now: Duration) -> BuffRecord {
        BuffRecord {
            target: self.target,
            stat: self.stat,
            source: self.source,
            magnitude: self.magnitude,
            is_percentage: self.is_percentage,
            original: self.original,
            end_time: now + self.remaining,
            serial: self.serial,
            mirrored: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuffExpire {
    pub target: EntityId,
    pub stat: StatKind,
    pub source: EntityId,
    pub original: f32,
    /// Serial of the application this expiry ends.
    pub serial: u32,
}

impl BuffExpire {
    pub fn from_record(record: &BuffRecord) -> Self {
        Self {
            target: record.target,
            stat: record.stat,
            source: record.source,
            original: record.original,
            serial: record.serial,
        }
    }

    pub fn key(&self) -> BuffKey {
        BuffKey {
            target: self.target,
            stat: self.stat,
            source: self.source,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeroSnapshot {
    pub hero: EntityId,
    pub seq: u32,
    pub kinematics: Kinematics,
}
