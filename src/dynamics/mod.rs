//! Frame timing telemetry.
//!
//! [`report_frame_dynamics`] is a transparent stage: every item passes
//! through untouched while frame items feed five histograms (id delta,
//! timestamp delta, arrival delta and the two rolling jitters). The first
//! frame of a subscription only sets the baseline.

mod rolling;

pub use rolling::{DEFAULT_WINDOW, JitterEstimator, RollingVariance};

use std::time::Instant;
use tracing::{debug, trace};

use crate::metrics::FrameDynamicsMetrics;
use crate::stream::{Op, map};
use crate::types::{EncodedPacket, FrameId, NetworkPacket, Timestamp};

/// Items that may mark the end of a frame
pub trait FrameTiming {
    /// Identity and presentation time when this item completes a frame
    fn frame_timing(&self) -> Option<(FrameId, Timestamp)>;
}

impl FrameTiming for EncodedPacket {
    fn frame_timing(&self) -> Option<(FrameId, Timestamp)> {
        self.as_frame().map(|frame| (frame.id, frame.timestamp))
    }
}

/// Only the final chunk of a frame counts as its arrival
impl FrameTiming for NetworkPacket {
    fn frame_timing(&self) -> Option<(FrameId, Timestamp)> {
        match self {
            NetworkPacket::FrameChunk { id, chunk, chunks, timestamp, .. } if chunk == chunks => {
                Some((*id, *timestamp))
            }
            _ => None,
        }
    }
}

/// Source of arrival times
pub trait Clock: Send + 'static {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deltas computed for one frame after the first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDeltas {
    pub id_delta: u64,
    pub timestamp_delta_ms: f64,
    pub arrival_delta_ms: f64,
    pub timestamp_jitter: Option<f64>,
    pub arrival_jitter: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    id: FrameId,
    timestamp: Timestamp,
    arrival: Instant,
}

/// Per-subscription dynamics state
#[derive(Debug)]
pub struct FrameDynamics<C = SystemClock> {
    clock: C,
    estimator: JitterEstimator,
    last: Option<Baseline>,
    timestamp_deltas: RollingVariance,
    arrival_deltas: RollingVariance,
}

impl FrameDynamics<SystemClock> {
    pub fn new(estimator: JitterEstimator) -> Self {
        Self::with_clock(estimator, SystemClock)
    }
}

impl<C: Clock> FrameDynamics<C> {
    pub fn with_clock(estimator: JitterEstimator, clock: C) -> Self {
        Self {
            clock,
            estimator,
            last: None,
            timestamp_deltas: RollingVariance::default(),
            arrival_deltas: RollingVariance::default(),
        }
    }

    /// Record a frame arrival; returns `None` for the first frame
    pub fn observe(&mut self, id: FrameId, timestamp: Timestamp) -> Option<FrameDeltas> {
        let arrival = self.clock.now();
        let previous = self.last.replace(Baseline { id, timestamp, arrival });

        let Some(previous) = previous else {
            debug!(frame_id = %id, "First frame, recording baseline");
            return None;
        };

        let timestamp_delta_ms = timestamp.abs_diff_millis(previous.timestamp) as f64;
        let arrival_delta_ms =
            arrival.saturating_duration_since(previous.arrival).as_millis() as f64;
        self.timestamp_deltas.push(timestamp_delta_ms);
        self.arrival_deltas.push(arrival_delta_ms);

        Some(FrameDeltas {
            id_delta: id.delta(previous.id),
            timestamp_delta_ms,
            arrival_delta_ms,
            timestamp_jitter: self.estimator.estimate(&self.timestamp_deltas),
            arrival_jitter: self.estimator.estimate(&self.arrival_deltas),
        })
    }
}

fn record(metrics: &FrameDynamicsMetrics, deltas: &FrameDeltas) {
    metrics.frame_id_deltas.observe(deltas.id_delta as f64);
    metrics.frame_timestamp_delta_millis.observe(deltas.timestamp_delta_ms);
    metrics.frame_arrival_time_delta_millis.observe(deltas.arrival_delta_ms);
    if let Some(jitter) = deltas.timestamp_jitter {
        metrics.frame_timestamp_jitter.observe(jitter);
    }
    if let Some(jitter) = deltas.arrival_jitter {
        metrics.frame_arrival_time_jitter.observe(jitter);
    }
}

/// Report frame dynamics into `metrics`, passing every item through
pub fn report_frame_dynamics<P>(
    metrics: FrameDynamicsMetrics,
    estimator: JitterEstimator,
) -> Op<P, P>
where
    P: FrameTiming + 'static,
{
    report_frame_dynamics_with_clock(metrics, estimator, SystemClock)
}

/// [`report_frame_dynamics`] with an explicit arrival clock
pub fn report_frame_dynamics_with_clock<P, C>(
    metrics: FrameDynamicsMetrics,
    estimator: JitterEstimator,
    clock: C,
) -> Op<P, P>
where
    P: FrameTiming + 'static,
    C: Clock,
{
    let mut dynamics = FrameDynamics::with_clock(estimator, clock);
    map(move |item: P| {
        if let Some((id, timestamp)) = item.frame_timing() {
            if let Some(deltas) = dynamics.observe(id, timestamp) {
                trace!(stage = %metrics.stage, frame_id = %id, ?deltas, "Frame dynamics");
                record(&metrics, &deltas);
            }
        }
        item
    })
}
