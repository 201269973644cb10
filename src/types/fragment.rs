//! Wire-level fragments delivered by the channel client

use serde::{Deserialize, Serialize};

use super::{FrameId, Timestamp};

/// One slice of a metadata blob or video frame as it travels over the channel.
///
/// Serialized as JSON with an internal `type` tag:
///
/// ```rust
/// use framewire::types::NetworkPacket;
///
/// let packet: NetworkPacket = serde_json::from_str(
///     r#"{"type": "frame", "id": {"i1": 1}, "chunk": 1, "chunks": 2,
///         "timestamp": 100, "base64_data": "AAEC"}"#,
/// )
/// .unwrap();
/// assert!(packet.is_frame_chunk());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkPacket {
    /// Codec name and base64-encoded codec parameters
    Metadata { codec_name: String, base64_data: String },

    /// One chunk of a base64-encoded frame
    #[serde(rename = "frame")]
    FrameChunk {
        id: FrameId,
        /// 1-based chunk index
        chunk: u32,
        /// Total chunk count of the frame
        chunks: u32,
        timestamp: Timestamp,
        base64_data: String,
    },
}

impl NetworkPacket {
    pub fn is_metadata(&self) -> bool {
        matches!(self, NetworkPacket::Metadata { .. })
    }

    pub fn is_frame_chunk(&self) -> bool {
        matches!(self, NetworkPacket::FrameChunk { .. })
    }

    /// Base64 payload regardless of variant
    pub fn base64_data(&self) -> &str {
        match self {
            NetworkPacket::Metadata { base64_data, .. } => base64_data,
            NetworkPacket::FrameChunk { base64_data, .. } => base64_data,
        }
    }
}
