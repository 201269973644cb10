//! Pipeline configuration
//!
//! A [`StreamConfig`] selects exactly one input and at most one output, plus
//! the knobs of the intermediate stages. It is usually loaded from YAML:
//!
//! ```rust
//! use framewire::config::{InputConfig, StreamConfig};
//!
//! let config = StreamConfig::from_yaml_str(
//!     r#"
//! input:
//!   type: replay_file
//!   path: capture.jsonl
//! limits:
//!   frames_limit: 100
//! "#,
//! )
//! .unwrap();
//! assert!(matches!(config.input, InputConfig::ReplayFile { .. }));
//! assert_eq!(config.buffers.network, 1024);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::dynamics::JitterEstimator;
use crate::provider::{ContainerOptions, DecodeOptions};
use crate::types::Resolution;
use crate::{Result, StreamError};

/// Default network fragment chunk size in base64 characters
pub const DEFAULT_CHUNK_SIZE: usize = 65_000;

/// Default metadata re-emission interval for channel outputs
pub const DEFAULT_METADATA_REPEAT_MS: u64 = 6000;

fn default_port() -> u16 {
    443
}

fn default_camera_resolution() -> Resolution {
    Resolution::Fixed { width: 320, height: 240 }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_metadata_repeat_ms() -> u64 {
    DEFAULT_METADATA_REPEAT_MS
}

fn default_replay_speed() -> f64 {
    1.0
}

/// Where encoded video comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputConfig {
    /// Fragments from a pub/sub channel
    Channel {
        endpoint: String,
        appkey: String,
        #[serde(default = "default_port")]
        port: u16,
        channel: String,
    },
    /// Container file read by the media backend
    VideoFile {
        path: PathBuf,
        #[serde(default, rename = "loop")]
        looped: bool,
        #[serde(default)]
        batch: bool,
    },
    /// Recorded fragments, one JSON object per line
    ReplayFile {
        path: PathBuf,
        #[serde(default)]
        batch: bool,
        /// Playback speed multiplier, clamped to `0.1..=10`
        #[serde(default = "default_replay_speed")]
        speed: f64,
    },
    /// Default camera device
    Camera {
        #[serde(default = "default_camera_resolution")]
        resolution: Resolution,
    },
    /// Remote media URL
    Url { url: String },
}

impl InputConfig {
    /// Batch mode skips pacing and the encoded buffer worker
    pub fn is_batch(&self) -> bool {
        matches!(
            self,
            InputConfig::VideoFile { batch: true, .. } | InputConfig::ReplayFile { batch: true, .. }
        )
    }
}

/// Where encoded video goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputConfig {
    /// Chunked fragments published to a channel
    Channel { channel: String },
    /// Container file written by the media backend
    File {
        path: PathBuf,
        #[serde(default)]
        reserved_index_space: u32,
    },
}

impl OutputConfig {
    /// Container options of a file output
    pub fn container_options(&self) -> Option<ContainerOptions> {
        match self {
            OutputConfig::File { reserved_index_space, .. } => {
                Some(ContainerOptions { reserved_index_space: *reserved_index_space })
            }
            OutputConfig::Channel { .. } => None,
        }
    }
}

/// Stop conditions for decoded and recorded streams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    pub time_limit_secs: Option<u64>,
    pub frames_limit: Option<u64>,
}

impl Limits {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }
}

/// Queue capacities of the worker boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferConfig {
    /// Fragments buffered behind the channel decoder
    pub network: usize,
    /// Encoded packets buffered behind file inputs
    pub encoded: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { network: 1024, encoded: 10 }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub output: Option<OutputConfig>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub decode: DecodeOptions,
    #[serde(default)]
    pub buffers: BufferConfig,
    #[serde(default = "default_metadata_repeat_ms")]
    pub metadata_repeat_interval_ms: u64,
    /// Maximum base64 characters per network fragment
    #[serde(default = "default_chunk_size")]
    pub network_chunk_size: usize,
    #[serde(default)]
    pub jitter: JitterEstimator,
}

impl StreamConfig {
    /// Configuration with defaults for everything but the input
    pub fn new(input: InputConfig) -> Self {
        Self {
            input,
            output: None,
            limits: Limits::default(),
            decode: DecodeOptions::default(),
            buffers: BufferConfig::default(),
            metadata_repeat_interval_ms: DEFAULT_METADATA_REPEAT_MS,
            network_chunk_size: DEFAULT_CHUNK_SIZE,
            jitter: JitterEstimator::default(),
        }
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: StreamConfig =
            serde_yaml_ng::from_str(yaml).map_err(|e| StreamError::parse("configuration", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| StreamError::file_error(path.to_path_buf(), e))?;
        debug!(path = %path.display(), "Loaded configuration");
        Self::from_yaml_str(&yaml)
    }

    pub fn metadata_repeat_interval(&self) -> Duration {
        Duration::from_millis(self.metadata_repeat_interval_ms)
    }

    /// Reject configurations that cannot be assembled
    pub fn validate(&self) -> Result<()> {
        match &self.input {
            InputConfig::Channel { endpoint, appkey, channel, .. } => {
                non_empty("input endpoint", endpoint)?;
                non_empty("input appkey", appkey)?;
                non_empty("input channel", channel)?;
            }
            InputConfig::VideoFile { path, .. } => non_empty_path("input path", path)?,
            InputConfig::ReplayFile { path, speed, .. } => {
                non_empty_path("input path", path)?;
                if !speed.is_finite() || *speed <= 0.0 {
                    return Err(StreamError::config("Replay speed must be a positive number"));
                }
            }
            InputConfig::Camera { .. } => {}
            InputConfig::Url { url } => non_empty("input url", url)?,
        }

        match &self.output {
            Some(OutputConfig::Channel { channel }) => {
                if matches!(self.input, InputConfig::Channel { .. }) {
                    return Err(StreamError::config(
                        "Channel input cannot be combined with channel output",
                    ));
                }
                non_empty("output channel", channel)?;
            }
            Some(OutputConfig::File { path, .. }) => non_empty_path("output path", path)?,
            None => {}
        }

        if self.buffers.network == 0 || self.buffers.encoded == 0 {
            return Err(StreamError::config("Buffer capacities must be positive"));
        }
        if self.network_chunk_size == 0 {
            return Err(StreamError::config("Network chunk size must be positive"));
        }
        if self.metadata_repeat_interval_ms == 0 {
            return Err(StreamError::config("Metadata repeat interval must be positive"));
        }
        if self.limits.time_limit_secs == Some(0) {
            return Err(StreamError::config("Time limit must be positive"));
        }
        Ok(())
    }
}

fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StreamError::config(format!("Missing {field}")));
    }
    Ok(())
}

fn non_empty_path(field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(StreamError::config(format!("Missing {field}")));
    }
    Ok(())
}
