//! Push-based stream composition for chunked video transport.
//!
//! framewire moves encoded video from one source (a pub/sub channel, a
//! replay file, a container file, a camera or a URL) to one sink (a channel
//! or a container file). Every stage is an operator on a cold, push-based
//! [`Publisher`](stream::Publisher).
//!
//! # Features
//!
//! - **Stream engine**: `map`, `flat_map`, `take`, `repeat_if`, a bounded
//!   worker-thread boundary and a wall-clock cutoff
//! - **Chunk reassembly**: base64 fragments back into whole frames, with
//!   self-healing on loss
//! - **Frame dynamics**: rolling jitter telemetry exported through
//!   `prometheus`
//! - **Pipeline assembly**: a YAML [`StreamConfig`](config::StreamConfig)
//!   wired to pluggable codec and channel collaborators
//!
//! # Example
//!
//! ```rust
//! use framewire::metrics::DecoderMetrics;
//! use framewire::network::decode_network_stream;
//! use framewire::stream::publishers;
//! use framewire::types::{FrameId, NetworkPacket, Timestamp};
//!
//! let chunk = |chunk, data: &str| NetworkPacket::FrameChunk {
//!     id: FrameId::new(1),
//!     chunk,
//!     chunks: 2,
//!     timestamp: Timestamp(100),
//!     base64_data: data.to_string(),
//! };
//!
//! let packets = publishers::of(vec![chunk(1, "AAEC"), chunk(2, "AwQ=")])
//!     .pipe(decode_network_stream(DecoderMetrics::new()?))
//!     .collect()?;
//! assert_eq!(packets[0].as_frame().unwrap().data.as_ref(), &[0, 1, 2, 3, 4]);
//! # Ok::<(), framewire::StreamError>(())
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Stream engine and operators
pub mod dynamics;
pub mod metrics;
pub mod network;
pub mod stream;

// Collaborators and assembly
pub mod config;
pub mod pipeline;
pub mod provider;
pub mod providers;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use config::StreamConfig;
pub use metrics::PipelineMetrics;
pub use pipeline::{Pipeline, RecordSummary};
pub use stream::{Flow, Op, Publisher, Subscriber};
