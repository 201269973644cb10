//! Concrete sources and sinks built on the collaborator traits

mod channel;
mod replay;

pub use channel::{ChannelSink, channel_source};
pub use replay::ReplaySource;
