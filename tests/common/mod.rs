//! Collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use framewire::provider::{ChannelClient, ContainerOptions, DecodeOptions, MediaBackend, PacketSink};
use framewire::stream::{Op, Publisher, flat_map, map, publishers};
use framewire::types::{EncodedPacket, FrameId, NetworkPacket, Timestamp};
use framewire::{Result, StreamError};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Channel client backed by a map of channel name to messages
#[derive(Default)]
pub struct LoopbackChannel {
    messages: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    /// Publisher handed out for `subscribe`, overriding stored messages
    live: Mutex<Option<Publisher<NetworkPacket>>>,
}

impl LoopbackChannel {
    pub fn preload(channel: &str, fragments: &[NetworkPacket]) -> Self {
        let client = Self::default();
        for fragment in fragments {
            client.publish(channel, serde_json::to_vec(fragment).unwrap()).unwrap();
        }
        client
    }

    pub fn live(source: Publisher<NetworkPacket>) -> Self {
        Self { live: Mutex::new(Some(source)), ..Self::default() }
    }

    pub fn fragments(&self, channel: &str) -> Vec<NetworkPacket> {
        let messages = self.messages.lock().unwrap();
        messages
            .get(channel)
            .map(|m| m.iter().map(|bytes| serde_json::from_slice(bytes).unwrap()).collect())
            .unwrap_or_default()
    }
}

impl ChannelClient for LoopbackChannel {
    fn subscribe(&self, channel: &str) -> Result<Publisher<NetworkPacket>> {
        if let Some(live) = self.live.lock().unwrap().take() {
            return Ok(live);
        }
        Ok(publishers::of(self.fragments(channel)))
    }

    fn publish(&self, channel: &str, message: Vec<u8>) -> Result<()> {
        self.messages.lock().unwrap().entry(channel.to_string()).or_default().push(message);
        Ok(())
    }
}

/// Decoded stand-in: frame id and payload length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: FrameId,
    pub len: usize,
}

pub type Written = Arc<Mutex<Vec<EncodedPacket>>>;

struct VecSink(Written);

impl PacketSink for VecSink {
    fn write(&mut self, packet: &EncodedPacket) -> Result<()> {
        self.0.lock().unwrap().push(packet.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Backend with an endless synthetic file source
#[derive(Default)]
pub struct SyntheticBackend {
    pub written: Written,
    /// Frame number at which the decoder fails
    pub fail_decode_at: Option<i64>,
}

impl MediaBackend for SyntheticBackend {
    type Image = Image;

    fn file_source(
        &self,
        _path: &Path,
        _looped: bool,
        batch: bool,
    ) -> Result<Publisher<EncodedPacket>> {
        let frames = (0..).map(move |i: i64| {
            if !batch {
                std::thread::sleep(std::time::Duration::from_millis(2));
            }
            EncodedPacket::frame(vec![(i % 256) as u8; 16], FrameId::new(i), Timestamp(i * 40))
        });
        let metadata = EncodedPacket::metadata("vp9", vec![1]);
        Ok(publishers::from_iter(std::iter::once(metadata).chain(frames)))
    }

    fn camera_source(
        &self,
        _resolution: &framewire::types::Resolution,
        _fps: u32,
    ) -> Result<Publisher<Image>> {
        Err(StreamError::config("no camera in tests"))
    }

    fn url_source(&self, _url: &str) -> Result<Publisher<EncodedPacket>> {
        Ok(publishers::empty())
    }

    fn encoder(&self, _lag_in_frames: u32) -> Op<Image, EncodedPacket> {
        map(|image: Image| EncodedPacket::frame(vec![0; image.len], image.id, Timestamp(0)))
    }

    fn decoder(&self, _options: &DecodeOptions) -> Op<EncodedPacket, Image> {
        let fail_at = self.fail_decode_at;
        flat_map(move |packet: EncodedPacket| match packet {
            EncodedPacket::Metadata(_) => publishers::empty(),
            EncodedPacket::Frame(frame) if Some(frame.id.i1) == fail_at => publishers::error(
                StreamError::transform("decode", anyhow::anyhow!("corrupt frame {}", frame.id)),
            ),
            EncodedPacket::Frame(frame) => {
                publishers::of(vec![Image { id: frame.id, len: frame.data.len() }])
            }
        })
    }

    fn container_sink(
        &self,
        _path: &Path,
        _options: &ContainerOptions,
    ) -> Result<Box<dyn PacketSink>> {
        Ok(Box::new(VecSink(Arc::clone(&self.written))))
    }
}

pub fn frame_chunk(id: i64, chunk: u32, chunks: u32, ts: i64, data: &str) -> NetworkPacket {
    NetworkPacket::FrameChunk {
        id: FrameId::new(id),
        chunk,
        chunks,
        timestamp: Timestamp(ts),
        base64_data: data.to_string(),
    }
}
