//! Timed stat modifications.
//!
//! The ledger runs on every peer: the applying peer writes records and
//! broadcasts them, mirrors adopt the broadcast and count down their own copy.
mod ledger;

pub use ledger::{BuffKey, BuffLedger, BuffRecord, BuffSpec};
