//! What the harness prints once the duel is over.

use std::collections::BTreeMap;

use arena_core::{CombatEvent, EntityId};
use arena_runtime::{Event, EventBus, LocalMatch, SessionEvent, Topic};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};

#[derive(Debug, Serialize)]
pub struct HeroLine {
    pub hero: EntityId,
    pub peer: String,
    pub health: f32,
    pub mana: f32,
    pub dead: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct NetworkLine {
    pub sent: u64,
    pub delivered: u64,
    pub duplicated: u64,
    pub reordered: u64,
    pub undeliverable: u64,
    pub dropped_frames: u64,
}

#[derive(Debug, Serialize)]
pub struct MatchSummary {
    #[serde(skip)]
    receivers: Vec<(Topic, broadcast::Receiver<Event>)>,
    /// Event counts per peer, then per kind.
    pub events: BTreeMap<String, BTreeMap<String, usize>>,
    pub deaths: Vec<String>,
    pub heroes: Vec<HeroLine>,
    pub network: NetworkLine,
}

impl MatchSummary {
    pub fn new(bus: &EventBus) -> Self {
        Self {
            receivers: bus.subscribe_all(),
            events: BTreeMap::new(),
            deaths: Vec::new(),
            heroes: Vec::new(),
            network: NetworkLine::default(),
        }
    }

    /// Drains everything published since the last call.
    pub fn collect(&mut self) {
        let mut drained = Vec::new();
        for (topic, rx) in &mut self.receivers {
            loop {
                match rx.try_recv() {
                    Ok(event) => drained.push(event),
                    Err(TryRecvError::Lagged(missed)) => {
                        tracing::warn!(%topic, missed, "summary fell behind");
                    }
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        }
        for event in drained {
            self.record(event);
        }
    }

    fn record(&mut self, event: Event) {
        match event {
            Event::Combat(record) => {
                *self
                    .events
                    .entry(record.peer.to_string())
                    .or_default()
                    .entry(record.event.kind().to_string())
                    .or_default() += 1;
                if let CombatEvent::Died { hero, killer } = record.event {
                    self.deaths.push(format!(
                        "{hero} at tick {} on {} (killer {})",
                        record.tick,
                        record.peer,
                        killer.map_or_else(|| "none".to_string(), |k| k.to_string())
                    ));
                }
            }
            Event::Session(SessionEvent::FrameDropped { .. }) => self.network.dropped_frames += 1,
            Event::Session(_) => {}
        }
    }

    /// Records every peer's final view of every hero.
    pub fn finish(&mut self, game: &LocalMatch) {
        self.collect();
        for peer in game.peers() {
            let Some(session) = game.session(peer) else {
                continue;
            };
            for hero in session.simulation().directory().heroes() {
                tracing::info!(
                    %peer,
                    hero = %hero.id,
                    health = hero.health(),
                    mana = hero.mana(),
                    "final view"
                );
                self.heroes.push(HeroLine {
                    hero: hero.id,
                    peer: peer.to_string(),
                    health: hero.health(),
                    mana: hero.mana(),
                    dead: hero.is_dead(),
                });
            }
        }
        let stats = game.network().stats();
        self.network = NetworkLine {
            sent: stats.sent,
            delivered: stats.delivered,
            duplicated: stats.duplicated,
            reordered: stats.reordered,
            undeliverable: stats.undeliverable,
            dropped_frames: self.network.dropped_frames,
        };
    }
}
