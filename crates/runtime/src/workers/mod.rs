//! Background tasks owned by the runtime.

mod session;

pub use session::{Command, SessionWorker};
