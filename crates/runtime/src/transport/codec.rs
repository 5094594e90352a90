//! Binary wire format for replicated envelopes.
//!
//! Envelopes travel as bincode (fixed-width integers, little endian). Frames
//! larger than [`WireCodec::MAX_FRAME_LEN`] are refused on both sides.

use arena_core::Envelope;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode envelope")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode frame of {len} bytes")]
    Decode {
        len: usize,
        #[source]
        source: bincode::Error,
    },

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
}

/// Stateless envelope codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct WireCodec;

impl WireCodec {
    pub const MAX_FRAME_LEN: usize = 64 * 1024;

    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
        let bytes = bincode::serialize(envelope).map_err(CodecError::Encode)?;
        if bytes.len() > Self::MAX_FRAME_LEN {
            return Err(CodecError::TooLarge {
                len: bytes.len(),
                max: Self::MAX_FRAME_LEN,
            });
        }
        Ok(bytes)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Envelope, CodecError> {
        if bytes.len() > Self::MAX_FRAME_LEN {
            return Err(CodecError::TooLarge {
                len: bytes.len(),
                max: Self::MAX_FRAME_LEN,
            });
        }
        bincode::deserialize(bytes).map_err(|source| CodecError::Decode {
            len: bytes.len(),
            source,
        })
    }
}
