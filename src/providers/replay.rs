//! Replay source for recorded fragment files
//!
//! A replay file holds one JSON-encoded [`NetworkPacket`] per line, in the
//! order they were received from the channel. Blank lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::stream::{Publisher, publishers};
use crate::types::NetworkPacket;
use crate::{Result, StreamError};

/// Replay of a recorded fragment file
#[derive(Debug, Clone)]
pub struct ReplaySource {
    path: PathBuf,

    /// Emit as fast as downstream consumes instead of pacing by timestamp
    batch: bool,

    /// Playback speed multiplier (1.0 = recorded speed)
    speed: f64,
}

impl ReplaySource {
    pub fn new(path: impl AsRef<Path>, batch: bool) -> Self {
        Self { path: path.as_ref().to_path_buf(), batch, speed: 1.0 }
    }

    /// Set playback speed, clamped to `0.1..=10`; ignored in batch mode
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = if speed.is_nan() { 1.0 } else { speed.clamp(0.1, 10.0) };
        self
    }

    /// Cold publisher of the file's fragments.
    ///
    /// The file is opened on subscription. In paced mode each fragment is
    /// held back until its timestamp offset from the first fragment has
    /// elapsed.
    pub fn publisher(self) -> Publisher<NetworkPacket> {
        publishers::defer(move || {
            let file = File::open(&self.path)
                .map_err(|e| StreamError::file_error(self.path.clone(), e))?;
            info!(
                path = %self.path.display(),
                batch = self.batch,
                speed = self.speed,
                "Opened replay file"
            );

            let mut reader = ReplayReader {
                path: self.path,
                lines: BufReader::new(file).lines(),
                line: 0,
            };
            let mut pacer = (!self.batch).then(|| Pacer::new(self.speed));

            Ok(publishers::generate(move || {
                let Some(packet) = reader.next_packet()? else {
                    debug!(
                        path = %reader.path.display(),
                        lines = reader.line,
                        "Replay file exhausted"
                    );
                    return Ok(None);
                };
                if let (Some(pacer), NetworkPacket::FrameChunk { timestamp, .. }) =
                    (&mut pacer, &packet)
                {
                    pacer.wait_for(timestamp.as_millis());
                }
                Ok(Some(packet))
            }))
        })
    }
}

struct ReplayReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
}

impl ReplayReader {
    fn next_packet(&mut self) -> Result<Option<NetworkPacket>> {
        for line in self.lines.by_ref() {
            self.line += 1;
            let line = line.map_err(|e| StreamError::file_error(self.path.clone(), e))?;
            if line.trim().is_empty() {
                continue;
            }
            let packet = serde_json::from_str(&line).map_err(|e| {
                StreamError::parse(format!("{}:{}", self.path.display(), self.line), e)
            })?;
            trace!(line = self.line, "Replayed fragment");
            return Ok(Some(packet));
        }
        Ok(None)
    }
}

/// Sleeps so fragments leave at their recorded relative times
struct Pacer {
    speed: f64,
    origin: Option<(Instant, i64)>,
}

impl Pacer {
    fn new(speed: f64) -> Self {
        Self { speed, origin: None }
    }

    /// Instant at which a fragment stamped `timestamp_ms` is due
    fn due(&mut self, timestamp_ms: i64) -> Option<Instant> {
        let (started, first_ms) = *self.origin.get_or_insert((Instant::now(), timestamp_ms));
        let offset_ms = timestamp_ms.saturating_sub(first_ms).max(0) as f64 / self.speed;
        started.checked_add(Duration::from_secs_f64(offset_ms / 1000.0))
    }

    fn wait_for(&mut self, timestamp_ms: i64) {
        let Some(due) = self.due(timestamp_ms) else {
            debug!(timestamp_ms, "Replay offset out of range, not pacing");
            return;
        };
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}
