//! Target resolution for decoded images

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resolution requested from the image decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// Keep the source resolution
    #[default]
    Original,

    /// Scale to the given size
    Fixed { width: u16, height: u16 },
}

impl Resolution {
    /// Parse `<width>x<height>` or `original`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("original") {
            return Some(Resolution::Original);
        }

        let (w, h) = s.split_once(['x', 'X'])?;
        let width = w.trim().parse::<u16>().ok().filter(|&v| v > 0)?;
        let height = h.trim().parse::<u16>().ok().filter(|&v| v > 0)?;
        Some(Resolution::Fixed { width, height })
    }
}

impl FromStr for Resolution {
    type Err = crate::StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::parse(s)
            .ok_or_else(|| crate::StreamError::config(format!("Unable to parse resolution: {s}")))
    }
}

impl TryFrom<String> for Resolution {
    type Error = crate::StreamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Original => f.write_str("original"),
            Resolution::Fixed { width, height } => write!(f, "{width}x{height}"),
        }
    }
}
