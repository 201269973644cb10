//! Reassembled encoded packets

use std::sync::Arc;

use super::{FrameId, Timestamp};

/// A fully reassembled metadata or frame unit ready for decode or transport.
///
/// Byte payloads are shared through `Arc<[u8]>`, so cloning a packet (for
/// metadata repetition or fan-in across a worker boundary) never copies data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedPacket {
    /// Codec name and raw codec parameters
    Metadata(EncodedMetadata),
    /// One encoded video frame
    Frame(EncodedFrame),
}

/// Codec description that must precede frames for a decoder to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMetadata {
    pub codec_name: String,
    pub codec_data: Arc<[u8]>,
}

/// Encoded frame payload with its identity and presentation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub data: Arc<[u8]>,
    pub id: FrameId,
    pub timestamp: Timestamp,
}

impl EncodedPacket {
    /// Create a metadata packet
    pub fn metadata(codec_name: impl Into<String>, codec_data: Vec<u8>) -> Self {
        EncodedPacket::Metadata(EncodedMetadata {
            codec_name: codec_name.into(),
            codec_data: codec_data.into(),
        })
    }

    /// Create a frame packet
    pub fn frame(data: Vec<u8>, id: FrameId, timestamp: Timestamp) -> Self {
        EncodedPacket::Frame(EncodedFrame { data: data.into(), id, timestamp })
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self, EncodedPacket::Metadata(_))
    }

    pub fn as_frame(&self) -> Option<&EncodedFrame> {
        match self {
            EncodedPacket::Frame(frame) => Some(frame),
            EncodedPacket::Metadata(_) => None,
        }
    }

    /// Payload size in bytes
    pub fn payload_len(&self) -> usize {
        match self {
            EncodedPacket::Metadata(m) => m.codec_data.len(),
            EncodedPacket::Frame(f) => f.data.len(),
        }
    }
}
