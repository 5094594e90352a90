//! Moving envelopes between peers.
//!
//! A [`Transport`] carries opaque [`Frame`]s; [`WireCodec`] turns envelopes
//! into frame payloads and back. The simulation assumes a reliable transport
//! that may still duplicate or reorder, which is exactly what
//! [`LoopbackNetwork`] can be told to do.
mod codec;
mod loopback;

pub use codec::{CodecError, WireCodec};
pub use loopback::{FaultInjection, LoopbackNetwork, LoopbackTransport, NetworkStats};

use arena_core::{DeliveryTarget, PeerId};
use async_trait::async_trait;
use thiserror::Error;

/// An encoded envelope plus the routing the transport needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub from: PeerId,
    pub target: DeliveryTarget,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Whether `peer` should receive this frame, given the session's master.
    pub fn addresses(&self, peer: PeerId, master: PeerId) -> bool {
        match self.target {
            DeliveryTarget::All => true,
            DeliveryTarget::AllExceptSender => peer != self.from,
            DeliveryTarget::Master => peer == master,
            DeliveryTarget::Peer(to) => peer == to,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{peer} is not connected")]
    Disconnected { peer: PeerId },

    #[error("{peer} is already connected")]
    AlreadyConnected { peer: PeerId },

    #[error("network state is poisoned")]
    Poisoned,
}

/// Frame delivery for one peer.
///
/// Implementations must deliver every frame at least once to every addressed
/// peer that is still connected. Frames addressed to `All` come back to the
/// sender as well.
#[async_trait]
pub trait Transport: Send {
    fn local(&self) -> PeerId;

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Frames that have already arrived. Never waits.
    fn drain(&mut self) -> Result<Vec<Frame>, TransportError>;
}
