//! Chunked transport of encoded packets over a pub/sub channel.
//!
//! Frames are base64-encoded and split into numbered chunks by
//! [`encode_network_stream`]; [`decode_network_stream`] concatenates the
//! chunks of each frame back together. Chunks are assumed to arrive in
//! order. A gap or reordering drops the frame in progress and the decoder
//! resynchronises at the next chunk 1.

mod decode;
mod encode;

pub use decode::{ChunkAssembler, decode_network_stream};
pub use encode::{chunk_packet, encode_network_stream};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DecoderMetrics;
    use crate::stream::publishers;
    use crate::types::{EncodedPacket, FrameId, Timestamp};
    use proptest::prelude::*;

    fn arb_packet() -> impl Strategy<Value = EncodedPacket> {
        prop_oneof![
            ("[a-z0-9]{1,8}", prop::collection::vec(any::<u8>(), 0..64))
                .prop_map(|(name, data)| EncodedPacket::metadata(name, data)),
            (prop::collection::vec(any::<u8>(), 1..2048), any::<i32>(), any::<i32>()).prop_map(
                |(data, id, ts)| {
                    EncodedPacket::frame(data, FrameId::new(id as i64), Timestamp(ts as i64))
                }
            ),
        ]
    }

    proptest! {
        #[test]
        fn chunked_stream_reassembles(
            packets in prop::collection::vec(arb_packet(), 0..16),
            max_chunk_len in 1usize..300,
        ) {
            let metrics = DecoderMetrics::new().unwrap();
            let decoded = publishers::of(packets.clone())
                .pipe(encode_network_stream(max_chunk_len))
                .pipe(decode_network_stream(metrics.clone()))
                .collect()
                .unwrap();

            prop_assert_eq!(decoded, packets);
            prop_assert_eq!(metrics.frame_chunks_mismatch.get(), 0);
        }
    }
}
