//! Packet chunking for the channel sink

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::stream::{Op, flat_map, publishers};
use crate::types::{EncodedPacket, NetworkPacket};

/// Split one encoded packet into wire fragments.
///
/// Metadata always travels as a single fragment. A frame's base64 text is
/// cut into pieces of at most `max_chunk_len` characters, numbered from 1;
/// an empty frame still produces one (empty) chunk. A `max_chunk_len` of 0
/// is treated as 1.
pub fn chunk_packet(packet: &EncodedPacket, max_chunk_len: usize) -> Vec<NetworkPacket> {
    match packet {
        EncodedPacket::Metadata(metadata) => vec![NetworkPacket::Metadata {
            codec_name: metadata.codec_name.clone(),
            base64_data: STANDARD.encode(&metadata.codec_data),
        }],
        EncodedPacket::Frame(frame) => {
            let text = STANDARD.encode(&frame.data);
            // base64 output is ASCII, so byte slicing stays on char boundaries
            let pieces: Vec<&str> = if text.is_empty() {
                vec![""]
            } else {
                text.as_bytes()
                    .chunks(max_chunk_len.max(1))
                    .map(|piece| std::str::from_utf8(piece).unwrap_or_default())
                    .collect()
            };

            let chunks = pieces.len() as u32;
            pieces
                .into_iter()
                .enumerate()
                .map(|(i, piece)| NetworkPacket::FrameChunk {
                    id: frame.id,
                    chunk: i as u32 + 1,
                    chunks,
                    timestamp: frame.timestamp,
                    base64_data: piece.to_string(),
                })
                .collect()
        }
    }
}

/// Chunk every encoded packet for network transport
pub fn encode_network_stream(max_chunk_len: usize) -> Op<EncodedPacket, NetworkPacket> {
    flat_map(move |packet: EncodedPacket| publishers::of(chunk_packet(&packet, max_chunk_len)))
}
