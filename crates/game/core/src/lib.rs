//! Ability execution and combat replication for a peer-to-peer arena.
//!
//! `arena-core` defines one peer's view of a match: heroes, ability instances
//! and the timed buffs they apply, plus the messages peers exchange to keep
//! those views consistent. It performs no I/O; transports and workers live in
//! `arena-runtime`. All state mutation flows through
//! [`engine::Simulation`], and supporting crates depend on the types
//! re-exported here.
pub mod ability;
pub mod buffs;
pub mod combat;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod replication;
pub mod schedule;
pub mod state;

pub use ability::{
    AbilityConfig, AbilityInstance, AbilityKey, AbilityKind, AbilityKindTag, AbilityState,
    AreaParams, AuraParams, BuffEffect, CastCosts, CrowdControl, CrowdControlKind, DestroyReason,
    ProjectileParams, RankOverride, ScriptParams, ScriptStep, Simulator, SpawnDescriptor,
    SpawnTransform, StepAction, TargetFilter, TickOutcome,
};
pub use buffs::{BuffKey, BuffLedger, BuffRecord, BuffSpec};
pub use combat::{CombatAuthority, DamageRequest, HealRequest, ManaSpend, RequestKey, mitigate};
pub use config::ArenaConfig;
pub use engine::{CombatEvent, CombatEventKind, HandlerTable, Simulation};
pub use env::{
    AbilityFactory, ArenaEnv, CollisionLayer, CollisionWorld, Hit, MovementCollaborator,
    NullMovement, Obstacle, RecordingMovement, WorldQuery,
};
pub use error::{BuffError, CastError, CombatError, ErrorSeverity, GameError};
pub use replication::{DeliveryTarget, Envelope, Message, MessageKind};
pub use schedule::{DelayedEffect, Scheduler, TimerId};
pub use state::{
    EntityDirectory, EntityId, Hero, Kinematics, LifeState, PeerId, PeerRoles, StatBlock,
    StatKind, Team, Tick, Vitals,
};
