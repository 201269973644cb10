//! Frame identity and presentation time

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, totally ordered frame identifier.
///
/// Only `i1` takes part in sequence arithmetic; `i2` is carried through
/// untouched for publishers that split identifiers in two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId {
    pub i1: i64,
    #[serde(default)]
    pub i2: i64,
}

impl FrameId {
    /// Create an identifier with `i2 == 0`
    pub const fn new(i1: i64) -> Self {
        Self { i1, i2: 0 }
    }

    /// Absolute sequence distance between two identifiers
    pub fn delta(self, other: FrameId) -> u64 {
        self.i1.abs_diff(other.i1)
    }
}

impl From<i64> for FrameId {
    fn from(i1: i64) -> Self {
        Self::new(i1)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.i1, self.i2)
    }
}

/// Presentation timestamp in milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Milliseconds since the Unix epoch
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Absolute distance to `other` in milliseconds
    pub fn abs_diff_millis(self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }
}
