//! Fragment reassembly

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{trace, warn};

use crate::metrics::DecoderMetrics;
use crate::stream::{Op, flat_map, publishers};
use crate::types::{EncodedPacket, FrameId, NetworkPacket, Timestamp};
use crate::{Result, StreamError};

/// Reassembly state for one subscription.
///
/// Accumulates the base64 text of a frame's chunks until the final chunk
/// arrives, then decodes the whole buffer at once.
#[derive(Debug)]
pub struct ChunkAssembler {
    metrics: DecoderMetrics,
    expected: u32,
    id: FrameId,
    buffer: String,
}

impl ChunkAssembler {
    pub fn new(metrics: DecoderMetrics) -> Self {
        Self { metrics, expected: 1, id: FrameId::default(), buffer: String::new() }
    }

    /// Chunk index the assembler is waiting for
    pub fn expected_chunk(&self) -> u32 {
        self.expected
    }

    /// Feed one fragment.
    ///
    /// Returns the packet it completed, if any. Metadata completes
    /// immediately and leaves frame state alone. Out-of-sequence chunks are
    /// counted, drop the frame in progress and yield `Ok(None)`; only a
    /// payload that is not valid base64 is an error.
    pub fn push(&mut self, packet: NetworkPacket) -> Result<Option<EncodedPacket>> {
        match packet {
            NetworkPacket::Metadata { codec_name, base64_data } => {
                let codec_data = STANDARD
                    .decode(base64_data.as_bytes())
                    .map_err(|e| {
                        StreamError::decode(format!("metadata for codec '{codec_name}'"), e)
                    })?;
                trace!(codec = %codec_name, bytes = codec_data.len(), "Decoded metadata");
                Ok(Some(EncodedPacket::metadata(codec_name, codec_data)))
            }
            NetworkPacket::FrameChunk { id, chunk, chunks, timestamp, base64_data } => {
                self.push_chunk(id, chunk, chunks, timestamp, &base64_data)
            }
        }
    }

    fn push_chunk(
        &mut self,
        id: FrameId,
        chunk: u32,
        chunks: u32,
        timestamp: Timestamp,
        base64_data: &str,
    ) -> Result<Option<EncodedPacket>> {
        if chunk == 0 || chunk > chunks {
            warn!(frame_id = %id, chunk, chunks, "Malformed chunk index");
            self.mismatch();
            return Ok(None);
        }

        if chunk == 1 {
            if self.expected != 1 {
                warn!(
                    frame_id = %id,
                    dropped_frame_id = %self.id,
                    expected = self.expected,
                    "New frame started before previous one completed"
                );
            }
            self.reset();
            self.id = id;
        } else if chunk != self.expected {
            warn!(frame_id = %id, expected = self.expected, got = chunk, "Chunk mismatch");
            self.mismatch();
            return Ok(None);
        }

        self.buffer.push_str(base64_data);

        if chunk < chunks {
            self.expected = chunk + 1;
            return Ok(None);
        }

        let id = self.id;
        let decoded = STANDARD.decode(self.buffer.as_bytes());
        self.reset();
        let data = decoded.map_err(|e| StreamError::decode(format!("frame {id}"), e))?;
        trace!(frame_id = %id, chunks, bytes = data.len(), "Reassembled frame");
        Ok(Some(EncodedPacket::frame(data, id, timestamp)))
    }

    fn mismatch(&mut self) {
        self.metrics.frame_chunks_mismatch.inc();
        self.reset();
    }

    fn reset(&mut self) {
        self.expected = 1;
        self.buffer.clear();
    }
}

/// Reassemble network fragments into encoded packets.
///
/// Each subscription gets its own [`ChunkAssembler`]. Mismatches are counted
/// in `metrics`; invalid base64 terminates the stream with
/// [`StreamError::Decode`].
pub fn decode_network_stream(metrics: DecoderMetrics) -> Op<NetworkPacket, EncodedPacket> {
    let mut assembler = ChunkAssembler::new(metrics);
    flat_map(move |packet| match assembler.push(packet) {
        Ok(Some(packet)) => publishers::of(vec![packet]),
        Ok(None) => publishers::empty(),
        Err(e) => publishers::error(e),
    })
}
