//! Brute-force collision world used by headless peers and tests.

use glam::Vec3;

use super::{CollisionLayer, Hit, WorldQuery};
use crate::state::{EntityId, Hero};

/// Axis-aligned static obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Obstacle {
    pub min: Vec3,
    pub max: Vec3,
}

impl Obstacle {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    fn expanded(&self, by: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(by),
            max: self.max + Vec3::splat(by),
        }
    }

    fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Outward normal of the face nearest to `point`.
    fn face_normal(&self, point: Vec3) -> Vec3 {
        let center = (self.min + self.max) * 0.5;
        let half = (self.max - self.min) * 0.5;
        let local = (point - center) / half.max(Vec3::splat(1e-6));
        let abs = local.abs();
        if abs.x >= abs.y && abs.x >= abs.z {
            Vec3::X * local.x.signum()
        } else if abs.y >= abs.z {
            Vec3::Y * local.y.signum()
        } else {
            Vec3::Z * local.z.signum()
        }
    }
}

/// Hero spheres plus static boxes.
#[derive(Clone, Debug, Default)]
pub struct CollisionWorld {
    hero_radius: f32,
    heroes: Vec<(EntityId, Vec3)>,
    obstacles: Vec<Obstacle>,
}

impl CollisionWorld {
    pub fn new(hero_radius: f32) -> Self {
        Self {
            hero_radius,
            heroes: Vec::new(),
            obstacles: Vec::new(),
        }
    }

    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    /// Replaces the hero set. Dead heroes are not collidable.
    pub fn sync_heroes<'a>(&mut self, heroes: impl IntoIterator<Item = &'a Hero>) {
        self.heroes.clear();
        self.heroes.extend(
            heroes
                .into_iter()
                .filter(|hero| !hero.is_dead())
                .map(|hero| (hero.id, hero.position())),
        );
    }

    pub fn set_hero(&mut self, id: EntityId, position: Vec3) {
        match self.heroes.iter_mut().find(|(hero, _)| *hero == id) {
            Some(entry) => entry.1 = position,
            None => self.heroes.push((id, position)),
        }
    }

    pub fn remove_hero(&mut self, id: EntityId) {
        self.heroes.retain(|(hero, _)| *hero != id);
    }
}

impl WorldQuery for CollisionWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: CollisionLayer) -> Vec<EntityId> {
        if !layers.contains(CollisionLayer::HEROES) {
            return Vec::new();
        }
        let reach = radius + self.hero_radius;
        self.heroes
            .iter()
            .filter(|(_, position)| position.distance_squared(center) <= reach * reach)
            .map(|(id, _)| *id)
            .collect()
    }

    fn sweep_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        ignore: &[EntityId],
    ) -> Option<Hit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }
        let mut best: Option<Hit> = None;

        for (id, center) in &self.heroes {
            if ignore.contains(id) {
                continue;
            }
            let Some(distance) =
                ray_sphere_enter(origin, direction, *center, radius + self.hero_radius)
            else {
                continue;
            };
            if distance > max_distance || best.is_some_and(|hit| hit.distance <= distance) {
                continue;
            }
            let contact = origin + direction * distance;
            let normal = (contact - *center).normalize_or(-direction);
            best = Some(Hit {
                entity: Some(*id),
                point: *center + normal * self.hero_radius,
                normal,
                distance,
            });
        }

        let end = origin + direction * max_distance;
        for obstacle in &self.obstacles {
            let grown = obstacle.expanded(radius);
            let Some(t) = segment_aabb_enter_t(origin, end, grown.min, grown.max) else {
                continue;
            };
            let distance = t * max_distance;
            if best.is_some_and(|hit| hit.distance <= distance) {
                continue;
            }
            let contact = origin + direction * distance;
            let normal = if grown.contains(origin) {
                -direction
            } else {
                grown.face_normal(contact)
            };
            best = Some(Hit {
                entity: None,
                point: contact - normal * radius,
                normal,
                distance,
            });
        }

        best
    }
}

/// Distance along a unit ray at which it enters a sphere. Zero when the
/// origin already lies inside.
#[inline]
fn ray_sphere_enter(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let m = origin - center;
    let c = m.dot(m) - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = m.dot(direction);
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    Some((-b - discriminant.sqrt()).max(0.0))
}

/// Parametric `t` in `[0, 1]` at which segment `[p0, p1]` first enters the box.
#[inline]
fn segment_aabb_enter_t(p0: Vec3, p1: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let d = p1 - p0;
    let mut tmin = 0.0f32;
    let mut tmax = 1.0f32;
    for i in 0..3 {
        let s = p0[i];
        let dir = d[i];
        if dir.abs() < 1e-6 {
            if s < min[i] || s > max[i] {
                return None;
            }
        } else {
            let inv = 1.0 / dir;
            let mut t0 = (min[i] - s) * inv;
            let mut t1 = (max[i] - s) * inv;
            if t0 > t1 {
                core::mem::swap(&mut t0, &mut t1);
            }
            tmin = tmin.max(t0);
            tmax = tmax.min(t1);
            if tmin > tmax {
                return None;
            }
        }
    }
    Some(tmin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_hero_at(x: f32) -> CollisionWorld {
        let mut world = CollisionWorld::new(0.5);
        world.set_hero(EntityId::hero(2), Vec3::new(x, 0.0, 0.0));
        world
    }

    #[test]
    fn sweep_reports_nearest_hero_contact() {
        let world = world_with_hero_at(10.0);
        let hit = world
            .sweep_sphere(Vec3::ZERO, 0.25, Vec3::X, 20.0, &[])
            .expect("hero in path");
        assert_eq!(hit.entity, Some(EntityId::hero(2)));
        assert!((hit.distance - 9.25).abs() < 1e-4);
        assert!((hit.normal - Vec3::NEG_X).length() < 1e-4);
    }

    #[test]
    fn sweep_stops_short_of_distant_hero() {
        let world = world_with_hero_at(10.0);
        assert!(
            world
                .sweep_sphere(Vec3::ZERO, 0.25, Vec3::X, 5.0, &[])
                .is_none()
        );
    }

    #[test]
    fn ignored_entities_are_transparent() {
        let world = world_with_hero_at(10.0);
        let hit = world.sweep_sphere(Vec3::ZERO, 0.25, Vec3::X, 20.0, &[EntityId::hero(2)]);
        assert!(hit.is_none());
    }

    #[test]
    fn wall_in_front_of_hero_wins() {
        let world = world_with_hero_at(10.0).with_obstacle(Obstacle::new(
            Vec3::new(4.0, -2.0, -2.0),
            Vec3::new(5.0, 2.0, 2.0),
        ));
        let hit = world
            .sweep_sphere(Vec3::ZERO, 0.25, Vec3::X, 20.0, &[])
            .expect("wall in path");
        assert!(hit.is_terrain());
        assert!((hit.distance - 3.75).abs() < 1e-4);
        assert_eq!(hit.normal, Vec3::NEG_X);
    }

    #[test]
    fn overlap_counts_hero_radius() {
        let world = world_with_hero_at(5.4);
        assert_eq!(
            world.overlap_sphere(Vec3::ZERO, 5.0, CollisionLayer::HEROES),
            vec![EntityId::hero(2)]
        );
        assert!(
            world
                .overlap_sphere(Vec3::ZERO, 5.0, CollisionLayer::TERRAIN)
                .is_empty()
        );
    }
}
