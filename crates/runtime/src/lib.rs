//! Runtime plumbing around the arena simulation.
//!
//! `arena-core` decides what happens in a match; this crate moves its
//! messages between peers and drives its clock. Each peer is a
//! [`PeerSession`]: it drains its [`Transport`], ticks its
//! [`arena_core::Simulation`], flushes the outbox back onto the transport and
//! publishes the tick's combat events on an [`EventBus`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts [`RuntimeConfig`] and the [`LocalMatch`] orchestrator
//! - [`api`] exposes the types clients interact with
//! - [`events`] provides the topic-based event bus
//! - [`transport`] holds the wire codec and the in-process loopback network
//! - [`session`] is one peer's drain, tick and flush loop
//! - `workers` keeps the background tasks internal to the crate
pub mod api;
pub mod events;
pub mod runtime;
pub mod session;
pub mod transport;

mod workers;

pub use api::{Result, RuntimeError, SessionHandle};
pub use events::{CombatRecord, Event, EventBus, SessionEvent, Topic};
pub use runtime::{LocalMatch, LocalMatchBuilder, MatchRuntime, RuntimeConfig, Seat};
pub use session::{PeerSession, StepReport};
pub use transport::{
    CodecError, FaultInjection, Frame, LoopbackNetwork, LoopbackTransport, NetworkStats, Transport,
    TransportError, WireCodec,
};
