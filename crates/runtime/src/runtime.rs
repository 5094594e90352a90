//! High-level match orchestrator.
//!
//! [`LocalMatch`] runs every peer of a match in one process over a
//! [`LoopbackNetwork`]. It can be stepped by hand, which keeps tests
//! deterministic, or handed to background workers with
//! [`LocalMatch::start`].

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use arena_content::Content;
use arena_core::{AbilityKey, EntityId, PeerId, PeerRoles, SpawnTransform, Team};
use glam::Vec3;

use crate::api::{Result, RuntimeError, SessionHandle};
use crate::events::{Event, EventBus, Topic};
use crate::session::{PeerSession, StepReport};
use crate::transport::{FaultInjection, LoopbackNetwork};
use crate::workers::SessionWorker;

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub tick_hz: u32,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Delivery faults of the loopback network.
    pub faults: FaultInjection,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            event_buffer_size: 1024,
            command_buffer_size: 32,
            faults: FaultInjection::NONE,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `ARENA_*` environment variables, after loading
    /// a `.env` file if one exists.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `ARENA_TICK_HZ` | `tick_hz` |
    /// | `ARENA_EVENT_BUFFER` | `event_buffer_size` |
    /// | `ARENA_COMMAND_BUFFER` | `command_buffer_size` |
    /// | `ARENA_DUPLICATE_CHANCE` | `faults.duplicate_chance` |
    /// | `ARENA_REORDER` | `faults.reorder` |
    /// | `ARENA_SEED` | `faults.seed` |
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`RuntimeConfig::from_env`], reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(hz) = parse(&lookup, "ARENA_TICK_HZ", |hz: &u32| *hz > 0)? {
            config.tick_hz = hz;
        }
        if let Some(size) = parse(&lookup, "ARENA_EVENT_BUFFER", |size: &usize| *size > 0)? {
            config.event_buffer_size = size;
        }
        if let Some(size) = parse(&lookup, "ARENA_COMMAND_BUFFER", |size: &usize| *size > 0)? {
            config.command_buffer_size = size;
        }
        if let Some(chance) = parse(&lookup, "ARENA_DUPLICATE_CHANCE", |chance: &f64| {
            (0.0..=1.0).contains(chance)
        })? {
            config.faults.duplicate_chance = chance;
        }
        if let Some(reorder) = parse(&lookup, "ARENA_REORDER", |_: &bool| true)? {
            config.faults.reorder = reorder;
        }
        if let Some(seed) = parse(&lookup, "ARENA_SEED", |_: &u64| true)? {
            config.faults.seed = seed;
        }
        Ok(config)
    }

    /// Sim time covered by one tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_hz.max(1)))
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    valid: impl Fn(&T) -> bool,
) -> Result<Option<T>> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let value = match raw.trim() {
        "yes" | "on" => "true",
        "no" | "off" => "false",
        other => other,
    };
    match value.parse::<T>().ok() {
        Some(parsed) if valid(&parsed) => Ok(Some(parsed)),
        _ => Err(RuntimeError::InvalidEnv { var, value: raw }),
    }
}

/// A hero taking part in the match.
#[derive(Debug, Clone, PartialEq)]
pub struct Seat {
    /// Roster slot; the hero's id is `EntityId::hero(slot)`.
    pub slot: u64,
    /// Name of a template in the content's hero roster.
    pub template: String,
    pub owner: PeerId,
    pub team: Team,
    pub position: Vec3,
}

impl Seat {
    pub fn new(
        slot: u64,
        template: impl Into<String>,
        owner: PeerId,
        team: Team,
        position: Vec3,
    ) -> Self {
        Self {
            slot,
            template: template.into(),
            owner,
            team,
            position,
        }
    }

    pub fn hero(&self) -> EntityId {
        EntityId::hero(self.slot)
    }
}

/// Every peer of a match, in one process.
pub struct LocalMatch {
    config: RuntimeConfig,
    network: LoopbackNetwork,
    bus: EventBus,
    sessions: BTreeMap<PeerId, PeerSession>,
}

impl LocalMatch {
    pub fn builder(content: Content) -> LocalMatchBuilder {
        LocalMatchBuilder::new(content)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.bus.subscribe(topic)
    }

    pub fn peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn session(&self, peer: PeerId) -> Option<&PeerSession> {
        self.sessions.get(&peer)
    }

    pub fn session_mut(&mut self, peer: PeerId) -> Result<&mut PeerSession> {
        self.sessions
            .get_mut(&peer)
            .ok_or(RuntimeError::UnknownPeer { peer })
    }

    /// Casts on the session of the peer that owns `caster`.
    pub fn cast(
        &mut self,
        caster: EntityId,
        key: impl Into<AbilityKey>,
        transform: SpawnTransform,
    ) -> Result<EntityId> {
        let key = key.into();
        let session = self
            .sessions
            .values_mut()
            .find(|session| {
                session
                    .hero(caster)
                    .is_some_and(|hero| hero.owner == session.peer())
            })
            .ok_or(RuntimeError::Cast(arena_core::CastError::CasterNotFound { caster }))?;
        session.cast(caster, &key, transform)
    }

    /// Steps every session once, in peer order.
    pub async fn step(&mut self) -> Result<StepReport> {
        let dt = self.config.tick_interval();
        let mut report = StepReport::default();
        for session in self.sessions.values_mut() {
            report += session.step(dt).await?;
        }
        Ok(report)
    }

    /// Steps every session `ticks` times.
    pub async fn run(&mut self, ticks: usize) -> Result<StepReport> {
        let mut report = StepReport::default();
        for _ in 0..ticks {
            report += self.step().await?;
        }
        Ok(report)
    }

    /// Steps until `duration` of sim time has passed.
    pub async fn run_for(&mut self, duration: Duration) -> Result<StepReport> {
        let dt = self.config.tick_interval();
        let ticks = duration.as_micros().div_ceil(dt.as_micros().max(1));
        self.run(usize::try_from(ticks).unwrap_or(usize::MAX)).await
    }

    /// Removes `peer` from the match without a goodbye, as if its process
    /// had died. Whatever it had in flight is lost.
    pub fn disconnect(&mut self, peer: PeerId) -> Result<PeerSession> {
        let session = self
            .sessions
            .remove(&peer)
            .ok_or(RuntimeError::UnknownPeer { peer })?;
        self.network.disconnect(peer)?;
        tracing::info!(%peer, "peer left the match");
        Ok(session)
    }

    /// Ends the match on every peer and delivers the teardown messages.
    pub async fn finish(mut self) -> Result<StepReport> {
        let mut report = StepReport::default();
        for session in self.sessions.values_mut() {
            report += session.end_match().await?;
        }
        Ok(report)
    }

    /// Moves every session onto its own background worker.
    pub fn start(self) -> MatchRuntime {
        let tick_interval = self.config.tick_interval();
        let mut handles = BTreeMap::new();
        let mut workers = Vec::new();
        for (peer, session) in self.sessions {
            let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer_size);
            let worker = SessionWorker::new(session, command_rx, tick_interval);
            workers.push(tokio::spawn(worker.run()));
            handles.insert(peer, SessionHandle::new(peer, command_tx, self.bus.clone()));
        }
        tracing::info!(peers = handles.len(), hz = self.config.tick_hz, "match started");
        MatchRuntime {
            handles,
            workers,
            network: self.network,
            bus: self.bus,
        }
    }
}

/// Builder for [`LocalMatch`].
pub struct LocalMatchBuilder {
    content: Content,
    config: RuntimeConfig,
    master: Option<PeerId>,
    peers: Vec<PeerId>,
    seats: Vec<Seat>,
}

impl LocalMatchBuilder {
    fn new(content: Content) -> Self {
        Self {
            content,
            config: RuntimeConfig::default(),
            master: None,
            peers: Vec::new(),
            seats: Vec::new(),
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// The peer arbitrating combat. Also joins it.
    pub fn master(mut self, peer: PeerId) -> Self {
        self.master = Some(peer);
        if !self.peers.contains(&peer) {
            self.peers.push(peer);
        }
        self
    }

    pub fn peer(mut self, peer: PeerId) -> Self {
        self.peers.push(peer);
        self
    }

    pub fn seat(mut self, seat: Seat) -> Self {
        self.seats.push(seat);
        self
    }

    /// Connects every peer and spawns every seated hero on every peer.
    ///
    /// # Errors
    ///
    /// A missing master, a peer joining twice, a seat owned by a peer not in
    /// the match, or a template missing from the roster.
    pub fn build(self) -> Result<LocalMatch> {
        let master = self
            .master
            .or_else(|| self.peers.first().copied())
            .ok_or(RuntimeError::MissingMaster {
                master: PeerId::default(),
            })?;
        if !self.peers.contains(&master) {
            return Err(RuntimeError::MissingMaster { master });
        }

        let network = LoopbackNetwork::new(master, self.config.faults);
        let bus = EventBus::with_capacity(self.config.event_buffer_size);
        let catalog = Arc::new(self.content.abilities);

        let mut sessions = BTreeMap::new();
        for &peer in &self.peers {
            if sessions.contains_key(&peer) {
                return Err(RuntimeError::DuplicatePeer { peer });
            }
            let transport = network.connect(peer)?;
            let session = PeerSession::new(
                PeerRoles::new(peer, master),
                self.content.config.clone(),
                Arc::clone(&catalog),
                Box::new(transport),
                bus.clone(),
            );
            sessions.insert(peer, session);
        }

        for seat in &self.seats {
            if !sessions.contains_key(&seat.owner) {
                return Err(RuntimeError::UnknownPeer { peer: seat.owner });
            }
            let template =
                self.content
                    .heroes
                    .get(&seat.template)
                    .ok_or_else(|| RuntimeError::UnknownHero {
                        name: seat.template.clone(),
                    })?;
            for session in sessions.values_mut() {
                let hero = template.spawn(seat.hero(), seat.owner, seat.team, seat.position);
                session.spawn_hero(hero);
            }
        }

        tracing::debug!(%master, peers = sessions.len(), heroes = self.seats.len(), "match built");
        Ok(LocalMatch {
            config: self.config,
            network,
            bus,
            sessions,
        })
    }
}

/// A match whose peers tick on background workers.
pub struct MatchRuntime {
    handles: BTreeMap<PeerId, SessionHandle>,
    workers: Vec<JoinHandle<()>>,
    network: LoopbackNetwork,
    bus: EventBus,
}

impl MatchRuntime {
    pub fn handle(&self, peer: PeerId) -> Result<SessionHandle> {
        self.handles
            .get(&peer)
            .cloned()
            .ok_or(RuntimeError::UnknownPeer { peer })
    }

    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.bus.subscribe(topic)
    }

    /// Ends the match on every peer and waits for the workers to exit.
    pub async fn shutdown(self) -> Result<()> {
        for handle in self.handles.values() {
            match handle.shutdown().await {
                Ok(()) | Err(RuntimeError::CommandChannelClosed) => {}
                Err(RuntimeError::ReplyChannelClosed(_)) => {}
                Err(error) => {
                    tracing::warn!(peer = %handle.peer(), %error, "peer did not shut down cleanly")
                }
            }
        }
        drop(self.handles);

        for worker in self.workers {
            worker.await.map_err(RuntimeError::WorkerJoin)?;
        }
        tracing::info!("match stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |var| {
            vars.iter()
                .find(|(name, _)| *name == var)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.tick_interval(), Duration::from_micros(33_333));
    }

    #[test]
    fn environment_overrides_apply() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("ARENA_TICK_HZ", "20"),
            ("ARENA_DUPLICATE_CHANCE", "0.25"),
            ("ARENA_REORDER", "yes"),
            ("ARENA_SEED", "99"),
        ]))
        .unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.faults.duplicate_chance, 0.25);
        assert!(config.faults.reorder);
        assert_eq!(config.faults.seed, 99);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = RuntimeConfig::from_lookup(lookup(&[("ARENA_DUPLICATE_CHANCE", "1.5")]))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidEnv {
                var: "ARENA_DUPLICATE_CHANCE",
                ..
            }
        ));
        assert!(RuntimeConfig::from_lookup(lookup(&[("ARENA_TICK_HZ", "0")])).is_err());
        assert!(RuntimeConfig::from_lookup(lookup(&[("ARENA_REORDER", "maybe")])).is_err());
    }
}
