use std::collections::BTreeMap;
use std::time::Duration;

use glam::Vec3;

use super::context::{ImpactSource, TickContext};
use super::descriptor::AreaParams;
use crate::env::CollisionLayer;
use crate::replication::AbilityCounters;
use crate::state::EntityId;

/// Radius scan with a per-target re-trigger timer.
///
/// A target is hit again only once `elapsed >= last_hit + damage_interval`.
/// With a zero interval the first scan is the only one. The radius grows every
/// tick regardless of scan cadence.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaScanner {
    center: Vec3,
    radius: f32,
    last_hit: BTreeMap<EntityId, Duration>,
    exhausted: bool,
}

impl AreaScanner {
    pub fn new(params: &AreaParams, center: Vec3) -> Self {
        Self {
            center,
            radius: params.radius,
            last_hit: BTreeMap::new(),
            exhausted: false,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn last_hit(&self, target: EntityId) -> Option<Duration> {
        self.last_hit.get(&target).copied()
    }

    pub fn counters(&self, impacts: u32) -> AbilityCounters {
        AbilityCounters {
            impacts,
            penetrations: 0,
            radius: self.radius,
        }
    }

    pub(crate) fn step(
        &mut self,
        params: &AreaParams,
        source: &mut ImpactSource<'_>,
        ctx: &mut TickContext<'_>,
        dt: Duration,
    ) {
        if !self.exhausted {
            self.scan(params, source, ctx);
        }
        if params.growth_per_sec > 0.0 {
            let grown = self.radius + params.growth_per_sec * dt.as_secs_f32();
            self.radius = params.max_radius.map_or(grown, |cap| grown.min(cap));
        }
    }

    fn scan(
        &mut self,
        params: &AreaParams,
        source: &mut ImpactSource<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        let interval = params.damage_interval();
        let now = source.elapsed;
        let candidates = ctx
            .world
            .overlap_sphere(self.center, self.radius, CollisionLayer::HEROES);

        for target in candidates {
            if !source.admits(ctx.heroes, target, params.targets) {
                continue;
            }
            let ready = if interval.is_zero() {
                !source.hit_set.contains(&target)
            } else {
                self.last_hit
                    .get(&target)
                    .is_none_or(|last| now >= *last + interval)
            };
            if !ready {
                continue;
            }
            self.last_hit.insert(target, now);

            let point = ctx
                .heroes
                .get(&target)
                .map_or(self.center, |hero| hero.position());
            let normal = (point - self.center).normalize_or(Vec3::Y);
            let crowd_control = source.config.crowd_control;
            source.impact(ctx, Some(target), point, normal, 1.0, crowd_control);
        }

        if interval.is_zero() {
            self.exhausted = true;
        }
    }
}
