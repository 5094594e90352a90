use glam::Vec3;

use super::context::{ImpactSource, TickContext};
use super::descriptor::{CrowdControl, CrowdControlKind, ScriptParams, StepAction};
use super::instance::DestroyReason;
use crate::config::secs;
use crate::env::CollisionLayer;
use crate::schedule::DelayedEffect;
use crate::state::EntityId;

/// Timed sequence of steps, each fired by the scheduler. Pending steps are
/// cancelled through the scheduler by owner, never one by one.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptRunner {
    fired: usize,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self { fired: 0 }
    }

    pub fn fired(&self) -> usize {
        self.fired
    }

    pub(crate) fn initialize(
        &mut self,
        params: &ScriptParams,
        ability: EntityId,
        ctx: &mut TickContext<'_>,
    ) {
        for (step, spec) in params.steps.iter().enumerate() {
            ctx.scheduler.schedule(
                ability,
                ctx.now + secs(spec.at_secs),
                DelayedEffect::ScriptStep { ability, step },
            );
        }
    }

    /// Executes one step. The caller has checked the instance and caster are
    /// still valid.
    pub(crate) fn run_step(
        &mut self,
        params: &ScriptParams,
        step: usize,
        source: &mut ImpactSource<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        let Some(spec) = params.steps.get(step) else {
            tracing::warn!(ability = %source.ability, step, "script step out of range");
            return;
        };
        self.fired += 1;
        let Some(origin) = ctx.heroes.get(&source.caster).map(|hero| hero.position()) else {
            return;
        };
        tracing::debug!(ability = %source.ability, step, action = ?spec.action, "script step");

        match spec.action {
            StepAction::Strike { radius, multiplier } => {
                for target in enemies_around(source, ctx, origin, radius) {
                    let point = ctx.heroes.get(&target).map_or(origin, |hero| hero.position());
                    let normal = (point - origin).normalize_or(Vec3::Y);
                    source.impact(ctx, Some(target), point, normal, multiplier, None);
                }
            }
            StepAction::Stun {
                radius,
                duration_secs,
            } => impair(source, ctx, origin, radius, CrowdControlKind::Stun, duration_secs),
            StepAction::Root {
                radius,
                duration_secs,
            } => impair(source, ctx, origin, radius, CrowdControlKind::Root, duration_secs),
            StepAction::HealCaster { amount } => {
                let caster = source.caster;
                source.heal(ctx, caster, amount);
            }
        }
    }

    /// A script without a lifetime ends after its last step.
    pub(crate) fn step(&self, params: &ScriptParams, has_lifetime: bool) -> Option<DestroyReason> {
        (!has_lifetime && self.fired >= params.steps.len()).then_some(DestroyReason::ScriptFinished)
    }
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn enemies_around(
    source: &ImpactSource<'_>,
    ctx: &TickContext<'_>,
    origin: Vec3,
    radius: f32,
) -> Vec<EntityId> {
    ctx.world
        .overlap_sphere(origin, radius, CollisionLayer::HEROES)
        .into_iter()
        .filter(|target| source.admits(ctx.heroes, *target, Default::default()))
        .collect()
}

fn impair(
    source: &mut ImpactSource<'_>,
    ctx: &mut TickContext<'_>,
    origin: Vec3,
    radius: f32,
    kind: CrowdControlKind,
    duration_secs: f32,
) {
    let cc = CrowdControl {
        kind,
        duration_secs,
    };
    for target in enemies_around(source, ctx, origin, radius) {
        let point = ctx.heroes.get(&target).map_or(origin, |hero| hero.position());
        let normal = (point - origin).normalize_or(Vec3::Y);
        source.impact(ctx, Some(target), point, normal, 0.0, Some(cc));
    }
}
