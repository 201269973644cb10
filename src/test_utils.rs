//! In-memory collaborators and fixture builders for tests and benchmarks
//!
//! Nothing here touches the network, a codec or a camera: the channel keeps
//! published messages in memory and the media backend turns packets into
//! small descriptive "images".

#![cfg(any(test, feature = "benchmark"))]

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::network::chunk_packet;
use crate::provider::{ChannelClient, ContainerOptions, DecodeOptions, MediaBackend, PacketSink};
use crate::stream::{Op, Publisher, flat_map, publishers};
use crate::types::{EncodedPacket, FrameId, NetworkPacket, Resolution, Timestamp};
use crate::{Result, StreamError};

/// Install a `tracing` subscriber honouring `RUST_LOG`, once per process
#[cfg(test)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Channel client that stores published messages per channel.
///
/// `subscribe` replays everything published to the channel so far and then
/// completes.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    messages: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    subscriptions: AtomicUsize,
}

impl MemoryChannel {
    /// Pre-load `channel` with serialized fragments
    pub fn with_fragments(channel: &str, fragments: &[NetworkPacket]) -> Self {
        let client = Self::default();
        for fragment in fragments {
            let message = serde_json::to_vec(fragment).unwrap_or_default();
            let _ = client.publish(channel, message);
        }
        client
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Messages published to `channel`, decoded as fragments
    pub fn fragments(&self, channel: &str) -> Vec<NetworkPacket> {
        self.raw(channel).iter().filter_map(|m| serde_json::from_slice(m).ok()).collect()
    }

    fn raw(&self, channel: &str) -> Vec<Vec<u8>> {
        let messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        messages.get(channel).cloned().unwrap_or_default()
    }
}

impl ChannelClient for MemoryChannel {
    fn subscribe(&self, channel: &str) -> Result<Publisher<NetworkPacket>> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let messages = self.raw(channel);
        Ok(publishers::from_iter(messages).pipe(crate::stream::try_map(|message: Vec<u8>| {
            Ok(serde_json::from_slice::<NetworkPacket>(&message)?)
        })))
    }

    fn publish(&self, channel: &str, message: Vec<u8>) -> Result<()> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| StreamError::channel_failed("memory channel poisoned"))?;
        messages.entry(channel.to_string()).or_default().push(message);
        Ok(())
    }
}

/// Image produced by [`FakeMediaBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeImage {
    pub id: FrameId,
    pub timestamp: Timestamp,
    pub resolution: Resolution,
    pub bytes: usize,
}

/// Packets written to a [`MemorySink`]
pub type SinkLog = Arc<Mutex<Vec<EncodedPacket>>>;

/// Sink appending packets to a shared vector
#[derive(Debug, Default)]
pub struct MemorySink {
    pub packets: SinkLog,
    pub finished: Arc<AtomicUsize>,
}

impl PacketSink for MemorySink {
    fn write(&mut self, packet: &EncodedPacket) -> Result<()> {
        let mut packets =
            self.packets.lock().map_err(|_| StreamError::channel_failed("sink poisoned"))?;
        packets.push(packet.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Media backend serving canned packets
#[derive(Debug, Default)]
pub struct FakeMediaBackend {
    /// Packets returned by `file_source` and `url_source`
    pub packets: Vec<EncodedPacket>,
    /// Images produced by `camera_source`
    pub camera_frames: usize,
    /// Packets written to container sinks
    pub written: SinkLog,
    /// Number of container sinks finished
    pub finished: Arc<AtomicUsize>,
    /// Paths passed to `container_sink`
    pub sink_paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeMediaBackend {
    pub fn with_packets(packets: Vec<EncodedPacket>) -> Self {
        Self { packets, ..Self::default() }
    }

    pub fn written(&self) -> Vec<EncodedPacket> {
        self.written.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl MediaBackend for FakeMediaBackend {
    type Image = FakeImage;

    fn file_source(
        &self,
        _path: &Path,
        _looped: bool,
        _batch: bool,
    ) -> Result<Publisher<EncodedPacket>> {
        Ok(publishers::of(self.packets.clone()))
    }

    fn camera_source(&self, resolution: &Resolution, _fps: u32) -> Result<Publisher<FakeImage>> {
        let resolution = *resolution;
        Ok(publishers::from_iter((0..self.camera_frames as i64).map(move |i| FakeImage {
            id: FrameId::new(i),
            timestamp: Timestamp(i * 40),
            resolution,
            bytes: 0,
        })))
    }

    fn url_source(&self, _url: &str) -> Result<Publisher<EncodedPacket>> {
        Ok(publishers::of(self.packets.clone()))
    }

    fn encoder(&self, _lag_in_frames: u32) -> Op<FakeImage, EncodedPacket> {
        let mut sent_metadata = false;
        flat_map(move |image: FakeImage| {
            let frame = EncodedPacket::frame(vec![image.id.i1 as u8; 4], image.id, image.timestamp);
            if std::mem::replace(&mut sent_metadata, true) {
                publishers::of(vec![frame])
            } else {
                publishers::of(vec![EncodedPacket::metadata("fake", vec![0]), frame])
            }
        })
    }

    fn decoder(&self, options: &DecodeOptions) -> Op<EncodedPacket, FakeImage> {
        let resolution = options.resolution;
        flat_map(move |packet: EncodedPacket| match packet {
            EncodedPacket::Metadata(_) => publishers::empty(),
            EncodedPacket::Frame(frame) => publishers::of(vec![FakeImage {
                id: frame.id,
                timestamp: frame.timestamp,
                resolution,
                bytes: frame.data.len(),
            }]),
        })
    }

    fn container_sink(
        &self,
        path: &Path,
        _options: &ContainerOptions,
    ) -> Result<Box<dyn PacketSink>> {
        if let Ok(mut paths) = self.sink_paths.lock() {
            paths.push(path.to_path_buf());
        }
        Ok(Box::new(MemorySink {
            packets: Arc::clone(&self.written),
            finished: Arc::clone(&self.finished),
        }))
    }
}

/// Encoded frames `0..count` with 40 ms spacing and `size`-byte payloads
pub fn encoded_frames(count: usize, size: usize) -> Vec<EncodedPacket> {
    (0..count as i64)
        .map(|i| {
            EncodedPacket::frame(vec![(i % 251) as u8; size], FrameId::new(i), Timestamp(i * 40))
        })
        .collect()
}

/// Metadata followed by [`encoded_frames`], chunked for the wire
pub fn network_fragments(count: usize, size: usize, max_chunk_len: usize) -> Vec<NetworkPacket> {
    std::iter::once(EncodedPacket::metadata("vp9", vec![1, 2, 3]))
        .chain(encoded_frames(count, size))
        .flat_map(|packet| chunk_packet(&packet, max_chunk_len))
        .collect()
}

/// Write fragments to `path` in replay file format
pub fn write_replay_file(path: &Path, fragments: &[NetworkPacket]) -> Result<()> {
    let mut file =
        std::fs::File::create(path).map_err(|e| StreamError::file_error(path.to_path_buf(), e))?;
    for fragment in fragments {
        let line = serde_json::to_string(fragment)?;
        writeln!(file, "{line}").map_err(|e| StreamError::file_error(path.to_path_buf(), e))?;
    }
    Ok(())
}
