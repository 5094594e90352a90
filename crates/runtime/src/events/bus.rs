//! Topic-based event bus implementation.

use std::sync::Arc;

use arena_core::{CombatEvent, CombatEventKind, PeerId, Tick};
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use tokio::sync::broadcast;

/// Topics for event routing
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumCount,
    strum::Display,
)]
pub enum Topic {
    /// Ability spawns, impacts, teardown and rejected casts
    Abilities,
    /// Damage, healing, deaths and respawns
    Vitals,
    /// Buff applications and expiries
    Buffs,
    /// Session lifecycle
    Session,
}

impl From<CombatEventKind> for Topic {
    fn from(kind: CombatEventKind) -> Self {
        match kind {
            CombatEventKind::AbilitySpawned
            | CombatEventKind::Impact
            | CombatEventKind::AbilityDestroyed
            | CombatEventKind::CastRejected => Topic::Abilities,
            CombatEventKind::Damaged
            | CombatEventKind::Healed
            | CombatEventKind::HealthChanged
            | CombatEventKind::Died
            | CombatEventKind::Respawned => Topic::Vitals,
            CombatEventKind::BuffApplied | CombatEventKind::BuffExpired => Topic::Buffs,
        }
    }
}

/// A combat event as observed by one peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatRecord {
    pub peer: PeerId,
    /// Tick during which the event happened.
    pub tick: Tick,
    pub event: CombatEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    Started { peer: PeerId },
    /// A received frame could not be decoded and was skipped.
    FrameDropped { peer: PeerId, reason: String },
    Stopped { peer: PeerId, tick: Tick },
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Combat(CombatRecord),
    Session(SessionEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Combat(record) => Topic::from(record.event.kind()),
            Event::Session(_) => Topic::Session,
        }
    }
}

/// Topic-based event bus
///
/// Every topic has its own broadcast channel, created up front, so
/// publishing never blocks and subscribers only see what they asked for.
/// Cloning yields another handle to the same channels.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<[broadcast::Sender<Event>; Topic::COUNT]>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(std::array::from_fn(|_| broadcast::channel(capacity).0)),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!(%topic, "no subscribers");
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> Vec<(Topic, broadcast::Receiver<Event>)> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }

    /// Subscribe to every topic
    pub fn subscribe_all(&self) -> Vec<(Topic, broadcast::Receiver<Event>)> {
        Topic::iter()
            .map(|topic| (topic, self.subscribe(topic)))
            .collect()
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        &self.channels[topic as usize]
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use arena_core::EntityId;

    use super::*;

    fn died() -> Event {
        Event::Combat(CombatRecord {
            peer: PeerId(1),
            tick: Tick(3),
            event: CombatEvent::Died {
                hero: EntityId::hero(1),
                killer: None,
            },
        })
    }

    #[test]
    fn events_reach_only_their_topic() {
        let bus = EventBus::new();
        let mut vitals = bus.subscribe(Topic::Vitals);
        let mut buffs = bus.subscribe(Topic::Buffs);

        bus.publish(died());

        assert_eq!(vitals.try_recv().unwrap(), died());
        assert!(buffs.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::with_capacity(0);
        bus.publish(Event::Session(SessionEvent::Started { peer: PeerId(1) }));
        let mut session = bus.clone().subscribe(Topic::Session);
        bus.publish(Event::Session(SessionEvent::Started { peer: PeerId(2) }));
        assert_eq!(
            session.try_recv().unwrap(),
            Event::Session(SessionEvent::Started { peer: PeerId(2) })
        );
    }

    #[test]
    fn every_topic_has_a_channel() {
        let bus = EventBus::new();
        assert_eq!(bus.subscribe_all().len(), Topic::COUNT);
    }
}
