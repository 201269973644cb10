//! Channel source and sink

use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::network::chunk_packet;
use crate::provider::{ChannelClient, PacketSink};
use crate::stream::{Publisher, publishers};
use crate::types::{EncodedPacket, NetworkPacket};
use crate::Result;

/// Fragments received on `channel`; the subscription is opened lazily
pub fn channel_source<C>(client: Arc<C>, channel: impl Into<String>) -> Publisher<NetworkPacket>
where
    C: ChannelClient + ?Sized,
{
    let channel = channel.into();
    publishers::defer(move || {
        info!(channel = %channel, "Subscribing to channel");
        client.subscribe(&channel)
    })
}

/// Publishes encoded packets as JSON fragments
pub struct ChannelSink<C: ?Sized> {
    client: Arc<C>,
    channel: String,
    max_chunk_len: usize,
    published: u64,
}

impl<C: ChannelClient + ?Sized> ChannelSink<C> {
    pub fn new(client: Arc<C>, channel: impl Into<String>, max_chunk_len: usize) -> Self {
        Self { client, channel: channel.into(), max_chunk_len, published: 0 }
    }

    /// Fragments published so far
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl<C: ChannelClient + ?Sized> PacketSink for ChannelSink<C> {
    fn write(&mut self, packet: &EncodedPacket) -> Result<()> {
        for fragment in chunk_packet(packet, self.max_chunk_len) {
            let message = serde_json::to_vec(&fragment)?;
            self.client.publish(&self.channel, message)?;
            self.published += 1;
        }
        trace!(channel = %self.channel, bytes = packet.payload_len(), "Published packet");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        debug!(channel = %self.channel, fragments = self.published, "Channel sink finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryChannel;
    use crate::types::{FrameId, Timestamp};

    #[test]
    fn sink_publishes_and_source_replays() {
        let client = Arc::new(MemoryChannel::default());
        let mut sink = ChannelSink::new(Arc::clone(&client), "video", 4);

        sink.write(&EncodedPacket::metadata("vp9", vec![1, 2])).unwrap();
        let frame = EncodedPacket::frame(vec![0, 1, 2, 3, 4], FrameId::new(1), Timestamp(5));
        sink.write(&frame).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.published(), 3);

        let fragments = channel_source(client, "video").collect().unwrap();
        assert_eq!(fragments.len(), 3);
        assert!(fragments[0].is_metadata());
        assert_eq!(fragments[2].base64_data(), "AwQ=");
    }

    #[test]
    fn subscribe_is_deferred() {
        let client = Arc::new(MemoryChannel::default());
        let source = channel_source(Arc::clone(&client), "video");
        assert_eq!(client.subscriptions(), 0);
        source.collect().unwrap();
        assert_eq!(client.subscriptions(), 1);
    }
}
