//! Prometheus instruments for reassembly and frame dynamics.
//!
//! Instruments are created unregistered so several pipelines (or tests) can
//! coexist in one process; call `register` to expose them through a
//! caller-owned [`Registry`].

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};

use crate::Result;

const ID_DELTA_BUCKETS: &[f64] = &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];

const DELTA_MILLIS_BUCKETS: &[f64] = &[
    0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 15.0, 20.0, 25.0, 30.0, 40.0, 50.0,
    60.0, 70.0, 80.0, 90.0, 100.0, 200.0, 300.0, 400.0, 500.0, 750.0, 1000.0,
];

const JITTER_BUCKETS: &[f64] = &[
    0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 15.0, 20.0, 25.0, 30.0, 40.0, 50.0,
    60.0, 70.0, 80.0, 90.0, 100.0, 150.0, 200.0, 250.0, 300.0, 400.0, 500.0,
];

/// Counters owned by the chunk reassembly operator
#[derive(Clone)]
pub struct DecoderMetrics {
    pub frame_chunks_mismatch: IntCounter,
}

impl DecoderMetrics {
    pub fn new() -> Result<Self> {
        let frame_chunks_mismatch = IntCounter::with_opts(Opts::new(
            "network_decoder_frame_chunks_mismatch",
            "Frame chunks received out of sequence",
        ))?;
        Ok(Self { frame_chunks_mismatch })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.frame_chunks_mismatch.clone()))?;
        Ok(())
    }
}

impl std::fmt::Debug for DecoderMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderMetrics")
            .field("frame_chunks_mismatch", &self.frame_chunks_mismatch.get())
            .finish()
    }
}

/// Histograms fed by one frame dynamics operator.
///
/// `stage` becomes a constant label so network and encoded dynamics share
/// metric names.
#[derive(Clone)]
pub struct FrameDynamicsMetrics {
    pub stage: String,
    pub frame_id_deltas: Histogram,
    pub frame_timestamp_delta_millis: Histogram,
    pub frame_timestamp_jitter: Histogram,
    pub frame_arrival_time_delta_millis: Histogram,
    pub frame_arrival_time_jitter: Histogram,
}

impl FrameDynamicsMetrics {
    pub fn new(stage: &str) -> Result<Self> {
        let histogram = |name: &str, help: &str, buckets: &[f64]| {
            let opts = HistogramOpts::new(name, help)
                .const_label("stage", stage)
                .buckets(buckets.to_vec());
            Histogram::with_opts(opts)
        };

        Ok(Self {
            stage: stage.to_string(),
            frame_id_deltas: histogram(
                "frame_id_deltas",
                "Distance between consecutive frame ids",
                ID_DELTA_BUCKETS,
            )?,
            frame_timestamp_delta_millis: histogram(
                "frame_timestamp_delta_millis",
                "Presentation timestamp delta between consecutive frames",
                DELTA_MILLIS_BUCKETS,
            )?,
            frame_timestamp_jitter: histogram(
                "frame_timestamp_jitter",
                "Rolling deviation of presentation timestamp deltas",
                JITTER_BUCKETS,
            )?,
            frame_arrival_time_delta_millis: histogram(
                "frame_arrival_time_delta_millis",
                "Wall-clock arrival delta between consecutive frames",
                DELTA_MILLIS_BUCKETS,
            )?,
            frame_arrival_time_jitter: histogram(
                "frame_arrival_time_jitter",
                "Rolling deviation of arrival time deltas",
                JITTER_BUCKETS,
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        for histogram in [
            &self.frame_id_deltas,
            &self.frame_timestamp_delta_millis,
            &self.frame_timestamp_jitter,
            &self.frame_arrival_time_delta_millis,
            &self.frame_arrival_time_jitter,
        ] {
            registry.register(Box::new(histogram.clone()))?;
        }
        Ok(())
    }
}

/// Every instrument a pipeline reports into
#[derive(Clone)]
pub struct PipelineMetrics {
    pub decoder: DecoderMetrics,
    pub network: FrameDynamicsMetrics,
    pub encoded: FrameDynamicsMetrics,
}

impl PipelineMetrics {
    pub const NETWORK_STAGE: &'static str = "network";
    pub const ENCODED_STAGE: &'static str = "encoded";

    pub fn new() -> Result<Self> {
        Ok(Self {
            decoder: DecoderMetrics::new()?,
            network: FrameDynamicsMetrics::new(Self::NETWORK_STAGE)?,
            encoded: FrameDynamicsMetrics::new(Self::ENCODED_STAGE)?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        self.decoder.register(registry)?;
        self.network.register(registry)?;
        self.encoded.register(registry)
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMetrics")
            .field("frame_chunks_mismatch", &self.decoder.frame_chunks_mismatch.get())
            .field("network_frames", &self.network.frame_id_deltas.get_sample_count())
            .field("encoded_frames", &self.encoded.frame_id_deltas.get_sample_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Metric;

    #[test]
    fn pipeline_metrics_register_both_stages() {
        let registry = Registry::new();
        let metrics = PipelineMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        metrics.network.frame_id_deltas.observe(1.0);
        metrics.decoder.frame_chunks_mismatch.inc();

        let families = registry.gather();
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"network_decoder_frame_chunks_mismatch".to_string()));
        assert!(names.contains(&"frame_arrival_time_jitter".to_string()));

        let id_deltas = families.iter().find(|f| f.get_name() == "frame_id_deltas").unwrap();
        assert_eq!(id_deltas.get_metric().len(), 2);
    }

    #[test]
    fn double_registration_is_rejected() {
        let registry = Registry::new();
        let decoder = DecoderMetrics::new().unwrap();
        decoder.register(&registry).unwrap();
        assert!(decoder.register(&registry).is_err());
    }

    #[test]
    fn jitter_buckets_match_fixed_layout() {
        let metrics = FrameDynamicsMetrics::new("encoded").unwrap();
        metrics.frame_timestamp_jitter.observe(120.0);
        let proto = metrics.frame_timestamp_jitter.metric();
        let buckets = proto.get_histogram().get_bucket();
        assert_eq!(buckets.len(), JITTER_BUCKETS.len());
        assert_eq!(buckets.last().unwrap().get_upper_bound(), 500.0);
    }
}
