//! Authoritative health and mana.
//!
//! Only the master peer mutates health and mana. Every other peer forwards
//! requests to it and applies the revisioned `HealthUpdate` it broadcasts.
//!
//! - `mitigate`: armor / magic resistance reduction
//! - [`CombatAuthority`]: request de-duplication, death and respawn
mod authority;
mod mitigation;
mod request;

pub use authority::{CombatAuthority, DamageOutcome, HealOutcome};
pub use mitigation::{apply_damage, mitigate};
pub use request::{DamageRequest, HealRequest, ManaSpend, RequestKey};
