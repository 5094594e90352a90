use glam::Vec3;

use crate::state::EntityId;

bitflags::bitflags! {
    /// Layers a spatial query is allowed to report.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct CollisionLayer: u8 {
        const HEROES = 1 << 0;
        const TERRAIN = 1 << 1;
    }
}

/// First contact reported by a swept query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// `None` when the sweep struck static geometry.
    pub entity: Option<EntityId>,
    pub point: Vec3,
    pub normal: Vec3,
    /// Distance travelled along the sweep direction before contact.
    pub distance: f32,
}

impl Hit {
    pub fn is_terrain(&self) -> bool {
        self.entity.is_none()
    }
}

/// Spatial queries against the collidable world.
///
/// The broad-phase behind this trait is not part of the simulation; peers
/// refresh it from the directory before every tick.
pub trait WorldQuery: Send + Sync {
    /// Entities on `layers` whose collision shape intersects the sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: CollisionLayer) -> Vec<EntityId>;

    /// Rolls a sphere from `origin` along the unit `direction` for at most
    /// `max_distance`, returning the nearest contact not in `ignore`.
    fn sweep_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        ignore: &[EntityId],
    ) -> Option<Hit>;
}
