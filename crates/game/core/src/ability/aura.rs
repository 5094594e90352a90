use std::time::Duration;

use glam::Vec3;

use super::context::{ImpactSource, TickContext};
use super::descriptor::AuraParams;
use super::instance::DestroyReason;
use crate::config::secs;
use crate::env::CollisionLayer;
use crate::error::CombatError;
use crate::state::EntityId;

/// Pure-buff ability: applies its buffs once at initialization and then only
/// waits for them to run out.
#[derive(Clone, Debug, PartialEq)]
pub struct BuffAura {
    center: Vec3,
    targets: Vec<EntityId>,
}

impl BuffAura {
    pub fn new(center: Vec3) -> Self {
        Self {
            center,
            targets: Vec::new(),
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Heroes that received the aura's buffs.
    pub fn targets(&self) -> &[EntityId] {
        &self.targets
    }

    pub(crate) fn initialize(
        &mut self,
        params: &AuraParams,
        source: &mut ImpactSource<'_>,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), CombatError> {
        let caster = ctx
            .heroes
            .get(&source.caster)
            .ok_or(CombatError::InvalidCaster {
                ability: source.ability,
                caster: source.caster,
            })?;
        self.center = caster.position();

        self.targets = if params.radius <= 0.0 {
            vec![source.caster]
        } else {
            ctx.world
                .overlap_sphere(self.center, params.radius, CollisionLayer::HEROES)
                .into_iter()
                .filter(|target| source.admits(ctx.heroes, *target, params.targets))
                .collect()
        };

        for target in &self.targets {
            for buff in &params.buffs {
                ctx.apply_buff(*target, &buff.spec(), source.ability);
            }
        }
        Ok(())
    }

    /// Without a lifetime cap the aura ends once all of its buffs expired and
    /// the minimum active time passed.
    pub(crate) fn step(
        &self,
        params: &AuraParams,
        source: &ImpactSource<'_>,
        ctx: &TickContext<'_>,
        lifetime: Option<Duration>,
    ) -> Option<DestroyReason> {
        if lifetime.is_some() {
            return None;
        }
        let lingered = source.elapsed >= secs(params.min_active_secs);
        (lingered && !ctx.ledger.has_source(source.ability)).then_some(DestroyReason::BuffsExpired)
    }
}
