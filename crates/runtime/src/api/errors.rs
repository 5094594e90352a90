//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, the wire codec, the transport and
//! match setup so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use arena_core::{CastError, PeerId};

use crate::transport::{CodecError, TransportError};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session worker command channel closed")]
    CommandChannelClosed,

    #[error("session worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("session worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cast rejected")]
    Cast(#[from] CastError),

    #[error("{peer} has no session in this match")]
    UnknownPeer { peer: PeerId },

    #[error("{peer} joined the match twice")]
    DuplicatePeer { peer: PeerId },

    #[error("hero template '{name}' is not in the roster")]
    UnknownHero { name: String },

    #[error("match has no master peer {master}")]
    MissingMaster { master: PeerId },

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}
