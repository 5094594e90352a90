//! Combat entity state.
//!
//! Heroes and ability instances live in the [`EntityDirectory`]; ids are
//! stable across peers so every wire message can refer to them directly.
mod common;
mod directory;
mod hero;
mod stats;

pub use common::{EntityId, PeerId, PeerRoles, Team, Tick};
pub use directory::{AbilityTable, EntityDirectory, HeroTable};
pub use hero::{Hero, Kinematics, LifeState, Vitals};
pub use stats::{StatBlock, StatKind};
