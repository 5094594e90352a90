//! Session worker that owns one peer's [`PeerSession`].
//!
//! Ticks the session at a fixed rate and serves commands from
//! [`SessionHandle`](crate::SessionHandle) between ticks, so commands never
//! interleave with a tick.

use std::time::Duration;

use arena_core::{AbilityKey, EntityId, Hero, SpawnTransform, Tick};
use glam::Vec3;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{Result, RuntimeError};
use crate::session::PeerSession;
use crate::transport::TransportError;

/// Commands that can be sent to the session worker
pub enum Command {
    /// Cast an ability for a hero owned by this peer.
    Cast {
        caster: EntityId,
        key: AbilityKey,
        transform: SpawnTransform,
        reply: oneshot::Sender<Result<EntityId>>,
    },
    /// Order a hero owned by this peer to move.
    Move {
        hero: EntityId,
        destination: Vec3,
        reply: oneshot::Sender<bool>,
    },
    /// Read this peer's view of a hero.
    QueryHero {
        hero: EntityId,
        reply: oneshot::Sender<Option<Hero>>,
    },
    /// Read the tick counter and sim time.
    QueryClock {
        reply: oneshot::Sender<(Tick, Duration)>,
    },
    /// End the match for this peer and stop the worker.
    Shutdown { reply: oneshot::Sender<Result<()>> },
}

/// Background task that ticks one peer.
pub struct SessionWorker {
    session: PeerSession,
    command_rx: mpsc::Receiver<Command>,
    tick_interval: Duration,
}

impl SessionWorker {
    pub fn new(
        session: PeerSession,
        command_rx: mpsc::Receiver<Command>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            session,
            command_rx,
            tick_interval,
        }
    }

    /// Main worker loop. Sim time advances by exactly one tick interval per
    /// tick, whatever the wall clock did.
    pub async fn run(mut self) {
        let peer = self.session.peer();
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Shutdown { reply }) => {
                        let result = self.session.end_match().await.map(|_| ());
                        if reply.send(result).is_err() {
                            debug!(%peer, "shutdown reply channel closed");
                        }
                        return;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = interval.tick() => {
                    match self.session.step(self.tick_interval).await {
                        Ok(_) => {}
                        Err(RuntimeError::Transport(TransportError::Disconnected { .. })) => {
                            info!(%peer, "transport closed, worker stopping");
                            return;
                        }
                        Err(error) => warn!(%peer, %error, "tick failed"),
                    }
                }
            }
        }

        if let Err(error) = self.session.end_match().await {
            debug!(%peer, %error, "match teardown incomplete");
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Cast {
                caster,
                key,
                transform,
                reply,
            } => {
                let result = self.session.cast(caster, &key, transform);
                if reply.send(result).is_err() {
                    debug!(%caster, %key, "cast reply channel closed");
                }
            }
            Command::Move {
                hero,
                destination,
                reply,
            } => {
                let accepted = self.session.command_move(hero, destination);
                if reply.send(accepted).is_err() {
                    debug!(%hero, "move reply channel closed");
                }
            }
            Command::QueryHero { hero, reply } => {
                if reply.send(self.session.hero(hero).cloned()).is_err() {
                    debug!(%hero, "hero query reply channel closed");
                }
            }
            Command::QueryClock { reply } => {
                let sim = self.session.simulation();
                if reply.send((sim.current_tick(), sim.now())).is_err() {
                    debug!("clock query reply channel closed");
                }
            }
            Command::Shutdown { .. } => {}
        }
    }
}
