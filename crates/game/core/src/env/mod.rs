//! Collaborators the simulation consumes but does not implement.
//!
//! The world query, ability factory and movement layer are owned by the host.
//! [`ArenaEnv`] bundles them so the engine can reach everything it needs for a
//! tick without hard coupling to concrete implementations.
mod collision;
mod factory;
mod movement;
mod world;

pub use collision::{CollisionWorld, Obstacle};
pub use factory::AbilityFactory;
pub use movement::{MovementCall, MovementCollaborator, NullMovement, RecordingMovement};
pub use world::{CollisionLayer, Hit, WorldQuery};

/// Aggregates the collaborators required by a simulation tick.
pub struct ArenaEnv<'a> {
    pub world: &'a dyn WorldQuery,
    pub factory: &'a dyn AbilityFactory,
    pub movement: &'a mut dyn MovementCollaborator,
}

impl<'a> ArenaEnv<'a> {
    pub fn new(
        world: &'a dyn WorldQuery,
        factory: &'a dyn AbilityFactory,
        movement: &'a mut dyn MovementCollaborator,
    ) -> Self {
        Self {
            world,
            factory,
            movement,
        }
    }
}
