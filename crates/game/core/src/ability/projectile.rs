//! Ballistic motion with continuous collision.
//!
//! Each tick the projectile sweeps its collision sphere along the segment it
//! is about to travel, so fast projectiles cannot tunnel through thin targets.
//! Targets it may pass through are added to the ignore list and the sweep
//! resumes from the contact, bounded by `MAX_PENETRATION_STEPS`.

use std::time::Duration;

use glam::Vec3;

use super::context::{ImpactSource, TickContext};
use super::descriptor::ProjectileParams;
use super::instance::{DestroyReason, SpawnTransform};
use crate::config::ArenaConfig;
use crate::replication::AbilityCounters;
use crate::state::{EntityId, Kinematics};

pub const GRAVITY: f32 = 9.81;

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSim {
    position: Vec3,
    velocity: Vec3,
    penetrations: u32,
}

impl ProjectileSim {
    pub fn new(params: &ProjectileParams, transform: &SpawnTransform) -> Self {
        Self {
            position: transform.origin,
            velocity: transform.direction.normalize_or(Vec3::X) * params.speed,
            penetrations: 0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn penetrations(&self) -> u32 {
        self.penetrations
    }

    pub fn kinematics(&self) -> Kinematics {
        let speed = self.velocity.length();
        Kinematics {
            position: self.position,
            direction: self.velocity.normalize_or(Vec3::X),
            moving: speed > 0.0,
            speed,
        }
    }

    pub fn counters(&self, impacts: u32) -> AbilityCounters {
        AbilityCounters {
            impacts,
            penetrations: self.penetrations,
            radius: 0.0,
        }
    }

    pub(crate) fn step(
        &mut self,
        params: &ProjectileParams,
        source: &mut ImpactSource<'_>,
        ctx: &mut TickContext<'_>,
        dt: Duration,
    ) -> Option<DestroyReason> {
        let dt = dt.as_secs_f32();
        if params.gravity {
            self.velocity.y -= GRAVITY * dt;
        }
        let travel = self.velocity * dt;
        let distance = travel.length();
        let direction = travel.normalize_or_zero();
        if distance <= f32::EPSILON {
            return None;
        }

        let mut ignore: Vec<EntityId> = Vec::with_capacity(4);
        ignore.push(source.caster);
        ignore.extend(source.hit_set.iter().copied());

        let mut travelled = 0.0f32;
        for _ in 0..ArenaConfig::MAX_PENETRATION_STEPS {
            let origin = self.position + direction * travelled;
            let remaining = distance - travelled;
            let Some(hit) = ctx.world.sweep_sphere(
                origin,
                params.collision_radius,
                direction,
                remaining,
                &ignore,
            ) else {
                break;
            };

            let Some(entity) = hit.entity else {
                self.position = origin + direction * hit.distance;
                source.impact(ctx, None, hit.point, hit.normal, 0.0, None);
                return Some(DestroyReason::Terrain);
            };

            ignore.push(entity);
            travelled += hit.distance;
            if !source.admits(ctx.heroes, entity, params.targets) {
                continue;
            }

            let crowd_control = source.config.crowd_control;
            source.impact(ctx, Some(entity), hit.point, hit.normal, 1.0, crowd_control);
            self.penetrations += 1;
            let spent = params.max_penetrations > 0 && self.penetrations >= params.max_penetrations;
            if !params.penetrates || spent {
                self.position = origin + direction * hit.distance;
                return Some(DestroyReason::Impact);
            }
        }

        self.position += travel;
        None
    }
}
