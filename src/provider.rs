//! Collaborator traits for sources and sinks
//!
//! The pipeline only knows these seams. Codecs, container muxing, capture
//! devices and the channel client live behind them and are supplied by the
//! embedding process.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;
use crate::stream::{Op, Publisher};
use crate::types::{EncodedPacket, NetworkPacket, Resolution};

/// Publish/subscribe contract of the channel client.
///
/// Reconnection and session management are the client's business; the
/// pipeline only subscribes once and publishes serialized fragments.
pub trait ChannelClient: Send + Sync + 'static {
    /// Stream of fragments received on `channel`
    fn subscribe(&self, channel: &str) -> Result<Publisher<NetworkPacket>>;

    /// Publish one serialized message to `channel`
    fn publish(&self, channel: &str, message: Vec<u8>) -> Result<()>;
}

/// Destination for encoded packets
pub trait PacketSink: Send {
    fn write(&mut self, packet: &EncodedPacket) -> Result<()>;

    /// Flush and close. Called once after the last packet.
    fn finish(&mut self) -> Result<()>;
}

impl<S: PacketSink + ?Sized> PacketSink for Box<S> {
    fn write(&mut self, packet: &EncodedPacket) -> Result<()> {
        (**self).write(packet)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Pixel layout of decoded images
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    #[default]
    Bgr,
    Rgb0,
}

/// Parameters for the image decoder stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub resolution: Resolution,
    pub pixel_format: PixelFormat,
    pub keep_proportions: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::Fixed { width: 320, height: 240 },
            pixel_format: PixelFormat::Bgr,
            keep_proportions: true,
        }
    }
}

/// Parameters for the container writer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Bytes reserved at the head of the file for the seek index
    pub reserved_index_space: u32,
}

/// Codec, container and capture collaborators.
///
/// Every method returns cold publishers or operators; nothing runs until the
/// assembled pipeline is subscribed.
pub trait MediaBackend: Send + Sync + 'static {
    /// Decoded image type produced by cameras and decoders
    type Image: Send + 'static;

    /// Encoded packets read from a container file.
    ///
    /// `looped` restarts at the end of the file; `batch` reads as fast as
    /// the consumer allows instead of pacing by presentation time.
    fn file_source(
        &self,
        path: &Path,
        looped: bool,
        batch: bool,
    ) -> Result<Publisher<EncodedPacket>>;

    /// Raw images captured from the default camera
    fn camera_source(&self, resolution: &Resolution, fps: u32) -> Result<Publisher<Self::Image>>;

    /// Encoded packets fetched from a URL
    fn url_source(&self, url: &str) -> Result<Publisher<EncodedPacket>>;

    /// Encoder turning raw images into packets
    fn encoder(&self, lag_in_frames: u32) -> Op<Self::Image, EncodedPacket>;

    /// Decoder turning packets into images
    fn decoder(&self, options: &DecodeOptions) -> Op<EncodedPacket, Self::Image>;

    /// Container writer
    fn container_sink(
        &self,
        path: &Path,
        options: &ContainerOptions,
    ) -> Result<Box<dyn PacketSink>>;
}
