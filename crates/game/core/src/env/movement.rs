use std::time::Duration;

use glam::Vec3;

use crate::state::EntityId;

/// Navigation contract of the movement layer.
///
/// The simulation only drives it; pathfinding and the collaborator's own
/// physics are out of scope. Calls are issued on the peer that owns the hero.
pub trait MovementCollaborator: Send {
    fn set_destination(&mut self, hero: EntityId, destination: Vec3);
    fn stop_movement(&mut self, hero: EntityId);
    fn apply_stun(&mut self, hero: EntityId, duration: Duration);
    fn apply_root(&mut self, hero: EntityId, duration: Duration);
    /// Refreshes the collaborator's cached copy of the hero's move speed.
    fn sync_move_speed(&mut self, hero: EntityId, speed: f32);
}

/// Movement layer that ignores every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMovement;

impl MovementCollaborator for NullMovement {
    fn set_destination(&mut self, _hero: EntityId, _destination: Vec3) {}
    fn stop_movement(&mut self, _hero: EntityId) {}
    fn apply_stun(&mut self, _hero: EntityId, _duration: Duration) {}
    fn apply_root(&mut self, _hero: EntityId, _duration: Duration) {}
    fn sync_move_speed(&mut self, _hero: EntityId, _speed: f32) {}
}

#[derive(Clone, Debug, PartialEq)]
pub enum MovementCall {
    SetDestination(EntityId, Vec3),
    Stop(EntityId),
    Stun(EntityId, Duration),
    Root(EntityId, Duration),
    SyncMoveSpeed(EntityId, f32),
}

/// Movement layer that records every call, in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingMovement {
    pub calls: Vec<MovementCall>,
}

impl RecordingMovement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest move speed pushed for `hero`.
    pub fn last_move_speed(&self, hero: EntityId) -> Option<f32> {
        self.calls.iter().rev().find_map(|call| match call {
            MovementCall::SyncMoveSpeed(id, speed) if *id == hero => Some(*speed),
            _ => None,
        })
    }

    pub fn take(&mut self) -> Vec<MovementCall> {
        std::mem::take(&mut self.calls)
    }
}

impl MovementCollaborator for RecordingMovement {
    fn set_destination(&mut self, hero: EntityId, destination: Vec3) {
        self.calls.push(MovementCall::SetDestination(hero, destination));
    }

    fn stop_movement(&mut self, hero: EntityId) {
        self.calls.push(MovementCall::Stop(hero));
    }

    fn apply_stun(&mut self, hero: EntityId, duration: Duration) {
        self.calls.push(MovementCall::Stun(hero, duration));
    }

    fn apply_root(&mut self, hero: EntityId, duration: Duration) {
        self.calls.push(MovementCall::Root(hero, duration));
    }

    fn sync_move_speed(&mut self, hero: EntityId, speed: f32) {
        self.calls.push(MovementCall::SyncMoveSpeed(hero, speed));
    }
}
