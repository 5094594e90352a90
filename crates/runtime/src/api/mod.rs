//! Public runtime API surface.
//!
//! Re-exports the types clients interact with: the session handle and the
//! runtime error.

mod errors;
mod handle;

pub use errors::{Result, RuntimeError};
pub use handle::SessionHandle;
