//! Topic-based event bus for runtime events.
//!
//! Every combat event a session drains from its simulation is published to
//! one topic; consumers subscribe only to the topics they need.

mod bus;

pub use bus::{CombatRecord, Event, EventBus, SessionEvent, Topic};
