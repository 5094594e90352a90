//! Ownership-based replication.
//!
//! Every entity has exactly one owning peer that simulates it; the others hold
//! read-only mirrors fed by two primitives:
//!
//! - the snapshot stream (`AbilitySnapshot`, `HeroSnapshot`), applied only when
//!   newer than the last applied sequence,
//! - targeted one-shot messages, which every receiver handles idempotently
//!   because the transport may duplicate, reorder or outlive the entity.
//!
//! Wire encoding belongs to the transport; this module only defines the
//! logical catalogue.
mod channel;
mod interpolate;
mod message;

pub use channel::{Outbox, SnapshotGate};
pub use interpolate::Interpolator;
pub use message::{
    AbilityCounters, AbilityImpact, AbilitySnapshot, BuffApply, BuffExpire, CreateAbility,
    DeliveryTarget, DestroyAbility, Envelope, HealthUpdate, HeroSnapshot, Message, MessageKind,
};
