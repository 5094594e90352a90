//! One peer's half of a match.
//!
//! A [`PeerSession`] glues a [`Simulation`] to a [`Transport`]. Every step it
//! applies whatever arrived, ticks the simulation, then sends the outbox, so
//! the simulation never sees a message in the middle of its own tick.

use std::sync::Arc;
use std::time::Duration;

use arena_content::AbilityCatalog;
use arena_core::{
    AbilityKey, ArenaConfig, ArenaEnv, CollisionWorld, EntityId, Hero, MovementCollaborator,
    NullMovement, PeerId, PeerRoles, Simulation, SpawnTransform, Tick,
};
use glam::Vec3;

use crate::api::Result;
use crate::events::{CombatRecord, Event, EventBus, SessionEvent};
use crate::transport::{Frame, Transport, WireCodec};

/// What one [`PeerSession::step`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Envelopes decoded and handed to the simulation.
    pub received: usize,
    /// Frames that failed to decode.
    pub dropped: usize,
    pub sent: usize,
    pub events: usize,
}

impl std::ops::AddAssign for StepReport {
    fn add_assign(&mut self, other: Self) {
        self.received += other.received;
        self.dropped += other.dropped;
        self.sent += other.sent;
        self.events += other.events;
    }
}

pub struct PeerSession {
    sim: Simulation,
    world: CollisionWorld,
    movement: Box<dyn MovementCollaborator>,
    catalog: Arc<AbilityCatalog>,
    transport: Box<dyn Transport>,
    codec: WireCodec,
    bus: EventBus,
    started: bool,
}

impl PeerSession {
    pub fn new(
        roles: PeerRoles,
        config: ArenaConfig,
        catalog: Arc<AbilityCatalog>,
        transport: Box<dyn Transport>,
        bus: EventBus,
    ) -> Self {
        Self {
            world: CollisionWorld::new(config.hero_radius),
            sim: Simulation::new(roles, config),
            movement: Box::new(NullMovement),
            catalog,
            transport,
            codec: WireCodec,
            bus,
            started: false,
        }
    }

    pub fn with_movement(mut self, movement: impl MovementCollaborator + 'static) -> Self {
        self.movement = Box::new(movement);
        self
    }

    /// Replaces the static level geometry. Hero positions are synced every
    /// step.
    pub fn with_world(mut self, world: CollisionWorld) -> Self {
        self.world = world;
        self
    }

    pub fn peer(&self) -> PeerId {
        self.sim.roles().local
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn hero(&self, id: EntityId) -> Option<&Hero> {
        self.sim.hero(id)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn spawn_hero(&mut self, hero: Hero) {
        self.sim.spawn_hero(hero);
    }

    /// Casts for a hero this peer owns. The cast's messages leave with the
    /// next step.
    pub fn cast(
        &mut self,
        caster: EntityId,
        key: &AbilityKey,
        transform: SpawnTransform,
    ) -> Result<EntityId> {
        let tick = self.sim.current_tick();
        let result = self.with_env(|sim, env| sim.cast(env, caster, key, transform));
        self.publish_events(tick);
        Ok(result?)
    }

    pub fn command_move(&mut self, hero: EntityId, destination: Vec3) -> bool {
        self.with_env(|sim, env| sim.command_move(env, hero, destination))
    }

    /// Drains the transport, ticks by `dt` and flushes the outbox.
    ///
    /// Undecodable frames are skipped and reported on the bus; transport
    /// failures end the step with an error.
    pub async fn step(&mut self, dt: Duration) -> Result<StepReport> {
        if !self.started {
            self.started = true;
            tracing::info!(
                peer = %self.peer(),
                master = %self.sim.roles().master,
                "session started"
            );
            self.bus.publish(Event::Session(SessionEvent::Started { peer: self.peer() }));
        }

        let tick = self.sim.current_tick();
        let mut report = StepReport::default();
        for frame in self.transport.drain()? {
            if self.receive(frame) {
                report.received += 1;
            } else {
                report.dropped += 1;
            }
        }

        self.with_env(|sim, env| sim.tick(env, dt));
        report.sent = self.flush().await?;
        report.events = self.publish_events(tick);
        Ok(report)
    }

    /// Tears down every ability, restores buffed stats and sends the
    /// resulting messages.
    pub async fn end_match(&mut self) -> Result<StepReport> {
        let tick = self.sim.current_tick();
        self.with_env(|sim, env| sim.end_match(env));
        let report = StepReport {
            sent: self.flush().await?,
            events: self.publish_events(tick),
            ..StepReport::default()
        };
        tracing::info!(peer = %self.peer(), %tick, "session stopped");
        self.bus.publish(Event::Session(SessionEvent::Stopped {
            peer: self.peer(),
            tick,
        }));
        Ok(report)
    }

    fn receive(&mut self, frame: Frame) -> bool {
        match self.codec.decode(&frame.payload) {
            Ok(envelope) => {
                self.with_env(|sim, env| sim.receive(env, envelope));
                true
            }
            Err(error) => {
                tracing::warn!(peer = %self.peer(), from = %frame.from, %error, "frame dropped");
                self.bus.publish(Event::Session(SessionEvent::FrameDropped {
                    peer: self.peer(),
                    reason: error.to_string(),
                }));
                false
            }
        }
    }

    async fn flush(&mut self) -> Result<usize> {
        let mut sent = 0;
        for envelope in self.sim.flush() {
            let payload = match self.codec.encode(&envelope) {
                Ok(payload) => payload,
                Err(error) => {
                    tracing::warn!(
                        peer = %self.peer(),
                        kind = %envelope.kind(),
                        %error,
                        "envelope not sent"
                    );
                    continue;
                }
            };
            self.transport
                .send(Frame {
                    from: envelope.from,
                    target: envelope.target,
                    payload,
                })
                .await?;
            sent += 1;
        }
        Ok(sent)
    }

    fn publish_events(&mut self, tick: Tick) -> usize {
        let peer = self.peer();
        let events = self.sim.drain_events();
        let count = events.len();
        for event in events {
            self.bus
                .publish(Event::Combat(CombatRecord { peer, tick, event }));
        }
        count
    }

    fn with_env<R>(&mut self, f: impl FnOnce(&mut Simulation, &mut ArenaEnv<'_>) -> R) -> R {
        self.world.sync_heroes(self.sim.directory().heroes());
        let mut env = ArenaEnv::new(&self.world, self.catalog.as_ref(), self.movement.as_mut());
        f(&mut self.sim, &mut env)
    }
}
