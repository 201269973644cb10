//! Core data types flowing through the pipeline.
//!
//! ## Architecture
//!
//! - [`NetworkPacket`] is the wire-level fragment produced by the channel client
//! - [`EncodedPacket`] is the reassembled unit consumed by decoders and sinks
//! - [`FrameId`] and [`Timestamp`] identify frames and their presentation time
//! - [`Resolution`] selects the decoded image size
//!
//! ## Usage Example
//!
//! ```rust
//! use framewire::types::{EncodedPacket, FrameId, NetworkPacket, Timestamp};
//!
//! let chunk = NetworkPacket::FrameChunk {
//!     id: FrameId::new(1),
//!     chunk: 1,
//!     chunks: 1,
//!     timestamp: Timestamp(100),
//!     base64_data: "AAEC".to_string(),
//! };
//! assert!(chunk.is_frame_chunk());
//!
//! let frame = EncodedPacket::frame(vec![0, 1, 2], FrameId::new(1), Timestamp(100));
//! assert_eq!(frame.payload_len(), 3);
//! ```

mod fragment;
mod frame;
mod packet;
mod resolution;

pub use fragment::NetworkPacket;
pub use frame::{FrameId, Timestamp};
pub use packet::{EncodedFrame, EncodedMetadata, EncodedPacket};
pub use resolution::Resolution;
