//! Ability instances and the simulators they compose.
//!
//! An [`AbilityInstance`] owns its lifecycle and delegates per-tick behavior
//! to exactly one [`Simulator`] variant chosen from the cast configuration.
mod area;
mod aura;
mod context;
mod descriptor;
mod instance;
mod projectile;
mod scripted;

pub use area::AreaScanner;
pub use aura::BuffAura;
pub use context::{ImpactSource, TickContext};
pub use descriptor::{
    AbilityConfig, AbilityKey, AbilityKind, AbilityKindTag, AreaParams, AuraParams, BuffEffect,
    CastCosts, CrowdControl, CrowdControlKind, ProjectileParams, RankOverride, ScriptParams,
    ScriptStep, SpawnDescriptor, StepAction, TargetFilter,
};
pub use instance::{AbilityInstance, AbilityState, DestroyReason, SpawnTransform, TickOutcome};
pub use projectile::{GRAVITY, ProjectileSim};
pub use scripted::ScriptRunner;

pub(crate) use context::apply_crowd_control;

/// Per-type behavior of an ability instance.
#[derive(Clone, Debug, PartialEq)]
pub enum Simulator {
    Projectile(ProjectileSim),
    AreaScan(AreaScanner),
    PureBuff(BuffAura),
    Scripted(ScriptRunner),
}

impl Simulator {
    pub fn from_config(config: &AbilityConfig, transform: &SpawnTransform) -> Self {
        match &config.kind {
            AbilityKind::Projectile(params) => {
                Self::Projectile(ProjectileSim::new(params, transform))
            }
            AbilityKind::AreaScan(params) => {
                Self::AreaScan(AreaScanner::new(params, transform.origin))
            }
            AbilityKind::PureBuff(_) => Self::PureBuff(BuffAura::new(transform.origin)),
            AbilityKind::Scripted(_) => Self::Scripted(ScriptRunner::new()),
        }
    }

    pub fn tag(&self) -> AbilityKindTag {
        match self {
            Self::Projectile(_) => AbilityKindTag::Projectile,
            Self::AreaScan(_) => AbilityKindTag::AreaScan,
            Self::PureBuff(_) => AbilityKindTag::PureBuff,
            Self::Scripted(_) => AbilityKindTag::Scripted,
        }
    }
}
