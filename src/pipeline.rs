//! Pipeline assembly from a [`StreamConfig`]
//!
//! ```text
//! channel ─► dynamics(network) ─► reassembly ─► worker(decoder_worker) ─┐
//! replay  ─► dynamics(network) ─► reassembly ─► worker(encoded buffer) ─┤
//! video file ─────────────────────────────────► worker(encoded buffer) ─┼─► encoded
//! camera ─► encoder ────────────────────────────────────────────────────┤
//! url ──────────────────────────────────────────────────────────────────┘
//!
//! encoded ─► dynamics(encoded) ─► decoder ─► [timer_breaker] ─► [take]   decoded
//! encoded ─► [timer_breaker] ─► [repeat metadata] ─► channel / container  record
//! ```
//!
//! Batch file inputs skip the worker so analysis runs frame by frame.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::{InputConfig, OutputConfig, StreamConfig};
use crate::dynamics::report_frame_dynamics;
use crate::metrics::PipelineMetrics;
use crate::network::decode_network_stream;
use crate::provider::{ChannelClient, MediaBackend, PacketSink};
use crate::providers::{ChannelSink, ReplaySource, channel_source};
use crate::stream::{Op, Publisher, flatten, repeat_if, take, threaded_worker, timer_breaker};
use crate::types::EncodedPacket;
use crate::{Result, StreamError};

/// Camera capture rate
pub const CAMERA_FPS: u32 = 25;

/// Encoder look-ahead used for camera input
pub const CAMERA_ENCODER_LAG: u32 = 25;

/// Worker name behind the channel decoder
pub const DECODER_WORKER: &str = "decoder_worker";

/// Worker name behind non-batch file inputs
pub const ENCODED_BUFFER_WORKER: &str = "input.encoded_buffer";

/// Totals reported by [`Pipeline::record`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub metadata: u64,
    pub frames: u64,
    pub bytes: u64,
}

impl RecordSummary {
    fn count(&mut self, packet: &EncodedPacket) {
        match packet {
            EncodedPacket::Metadata(_) => self.metadata += 1,
            EncodedPacket::Frame(_) => self.frames += 1,
        }
        self.bytes += packet.payload_len() as u64;
    }
}

/// Sink stage: a preparation operator followed by a packet sink
pub struct EncodedSink {
    prepare: Op<EncodedPacket, EncodedPacket>,
    sink: Box<dyn PacketSink>,
}

impl EncodedSink {
    pub fn new(prepare: Op<EncodedPacket, EncodedPacket>, sink: Box<dyn PacketSink>) -> Self {
        Self { prepare, sink }
    }

    /// Drain `source` into the sink on the calling thread
    pub fn drain(self, source: Publisher<EncodedPacket>) -> Result<RecordSummary> {
        let Self { prepare, mut sink } = self;
        let mut summary = RecordSummary::default();

        let outcome = source.pipe(prepare).try_for_each(|packet| {
            summary.count(&packet);
            sink.write(&packet)
        });

        if let Err(e) = outcome {
            error!(error = %e, frames = summary.frames, "Recording failed");
            return Err(e);
        }
        sink.finish()?;
        info!(
            metadata = summary.metadata,
            frames = summary.frames,
            bytes = summary.bytes,
            "Recording finished"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for EncodedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedSink").finish_non_exhaustive()
    }
}

/// A validated configuration bound to its collaborators
pub struct Pipeline<B: MediaBackend> {
    config: StreamConfig,
    backend: Arc<B>,
    client: Option<Arc<dyn ChannelClient>>,
    metrics: PipelineMetrics,
}

impl<B: MediaBackend> Pipeline<B> {
    /// Validate `config` and bind it to a media backend
    pub fn new(config: StreamConfig, backend: Arc<B>, metrics: PipelineMetrics) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend, client: None, metrics })
    }

    /// Channel client used by channel inputs and outputs
    pub fn with_channel_client(mut self, client: Arc<dyn ChannelClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    fn client(&self) -> Result<Arc<dyn ChannelClient>> {
        self.client.clone().ok_or_else(|| {
            StreamError::config("Channel client required for channel input or output")
        })
    }

    /// Encoded packets from the configured input
    pub fn encoded_publisher(&self) -> Result<Publisher<EncodedPacket>> {
        let jitter = self.config.jitter;

        let source = match &self.config.input {
            InputConfig::Channel { channel, .. } => {
                info!(channel = %channel, "Assembling channel input");
                channel_source(self.client()?, channel.as_str())
                    .pipe(report_frame_dynamics(self.metrics.network.clone(), jitter))
                    .pipe(decode_network_stream(self.metrics.decoder.clone()))
                    .pipe(threaded_worker(DECODER_WORKER, self.config.buffers.network))
                    .pipe(flatten())
            }
            InputConfig::ReplayFile { path, batch, speed } => {
                info!(path = %path.display(), batch, speed, "Assembling replay input");
                let source = ReplaySource::new(path, *batch)
                    .with_speed(*speed)
                    .publisher()
                    .pipe(report_frame_dynamics(self.metrics.network.clone(), jitter))
                    .pipe(decode_network_stream(self.metrics.decoder.clone()));
                self.buffered(source)
            }
            InputConfig::VideoFile { path, looped, batch } => {
                info!(path = %path.display(), looped, batch, "Assembling video file input");
                self.buffered(self.backend.file_source(path, *looped, *batch)?)
            }
            InputConfig::Camera { resolution } => {
                info!(%resolution, fps = CAMERA_FPS, "Assembling camera input");
                self.backend
                    .camera_source(resolution, CAMERA_FPS)?
                    .pipe(self.backend.encoder(CAMERA_ENCODER_LAG))
            }
            InputConfig::Url { url } => {
                info!(url = %url, "Assembling url input");
                self.backend.url_source(url)?
            }
        };
        Ok(source)
    }

    /// File inputs get the encoded buffer worker unless they run in batch mode
    fn buffered(&self, source: Publisher<EncodedPacket>) -> Publisher<EncodedPacket> {
        if self.config.input.is_batch() {
            return source;
        }
        source
            .pipe(threaded_worker(ENCODED_BUFFER_WORKER, self.config.buffers.encoded))
            .pipe(flatten())
    }

    /// Decoded images from the configured input, with limits applied
    pub fn decoded_publisher(&self) -> Result<Publisher<B::Image>> {
        let mut source = self
            .encoded_publisher()?
            .pipe(report_frame_dynamics(self.metrics.encoded.clone(), self.config.jitter))
            .pipe(self.backend.decoder(&self.config.decode));

        if let Some(limit) = self.config.limits.time_limit() {
            debug!(limit_secs = limit.as_secs(), "Applying time limit");
            source = source.pipe(timer_breaker(limit));
        }
        if let Some(frames) = self.config.limits.frames_limit {
            debug!(frames, "Applying frames limit");
            source = source.pipe(take(frames));
        }
        Ok(source)
    }

    /// Sink stage for the configured output
    pub fn encoded_sink(&self) -> Result<EncodedSink> {
        match &self.config.output {
            Some(OutputConfig::Channel { channel }) => {
                let sink = ChannelSink::new(
                    self.client()?,
                    channel.as_str(),
                    self.config.network_chunk_size,
                );
                let repeat =
                    repeat_if(self.config.metadata_repeat_interval(), EncodedPacket::is_metadata);
                Ok(EncodedSink::new(repeat, Box::new(sink)))
            }
            Some(output @ OutputConfig::File { path, .. }) => {
                let options = output.container_options().unwrap_or_default();
                let sink = self.backend.container_sink(path, &options)?;
                Ok(EncodedSink::new(Op::identity(), sink))
            }
            None => Err(StreamError::config("No output configured")),
        }
    }

    /// Copy the input to the output until the input ends or the time limit
    /// fires
    pub fn record(&self) -> Result<RecordSummary> {
        let sink = self.encoded_sink()?;
        let mut source = self.encoded_publisher()?;
        if let Some(limit) = self.config.limits.time_limit() {
            source = source.pipe(timer_breaker(limit));
        }
        sink.drain(source)
    }
}

impl<B: MediaBackend> std::fmt::Debug for Pipeline<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("has_channel_client", &self.client.is_some())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
