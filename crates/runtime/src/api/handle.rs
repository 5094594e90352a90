//! Cloneable façade for issuing commands to a session worker.
//!
//! [`SessionHandle`] hides channel plumbing and offers async helpers for
//! casting, moving, reading the peer's view and streaming events from
//! specific topics.
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

use arena_core::{AbilityKey, EntityId, Hero, PeerId, SpawnTransform, Tick};
use glam::Vec3;

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to one peer of a running match
#[derive(Clone)]
pub struct SessionHandle {
    peer: PeerId,
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl SessionHandle {
    pub(crate) fn new(
        peer: PeerId,
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            peer,
            command_tx,
            event_bus,
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Cast an ability for a hero this peer owns
    pub async fn cast(
        &self,
        caster: EntityId,
        key: impl Into<AbilityKey>,
        transform: SpawnTransform,
    ) -> Result<EntityId> {
        let key = key.into();
        self.request(|reply| Command::Cast {
            caster,
            key,
            transform,
            reply,
        })
        .await?
    }

    /// Order a hero this peer owns to move. Returns whether the order was
    /// accepted.
    pub async fn move_to(&self, hero: EntityId, destination: Vec3) -> Result<bool> {
        self.request(|reply| Command::Move {
            hero,
            destination,
            reply,
        })
        .await
    }

    /// This peer's current view of a hero
    pub async fn hero(&self, hero: EntityId) -> Result<Option<Hero>> {
        self.request(|reply| Command::QueryHero { hero, reply }).await
    }

    /// Tick counter and sim time of this peer
    pub async fn clock(&self) -> Result<(Tick, Duration)> {
        self.request(|reply| Command::QueryClock { reply }).await
    }

    /// End the match on this peer and stop its worker
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await?
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Abilities` - Spawns, impacts, teardown and rejected casts
    /// - `Topic::Vitals` - Damage, healing, deaths and respawns
    /// - `Topic::Buffs` - Buff applications and expiries
    /// - `Topic::Session` - Session start, stop and dropped frames
    ///
    /// The bus is shared by every peer of the match; records carry the peer
    /// that observed them.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }
}
