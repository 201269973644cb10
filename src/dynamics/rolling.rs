//! Windowed variance accumulator and jitter estimators

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of samples kept by the dynamics accumulators
pub const DEFAULT_WINDOW: usize = 25;

/// Population variance over the most recent `window` samples
#[derive(Debug, Clone)]
pub struct RollingVariance {
    window: usize,
    samples: VecDeque<f64>,
}

impl RollingVariance {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self { window, samples: VecDeque::with_capacity(window) }
    }

    /// Add a sample, evicting the oldest one once the window is full
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Population variance (divides by `n`)
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        let n = self.samples.len() as f64;
        Some(self.samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n)
    }
}

impl Default for RollingVariance {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// How jitter is derived from the windowed variance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterEstimator {
    /// Bessel-corrected sample standard deviation, `sqrt(var * n / (n - 1))`.
    /// Zero until two samples are available.
    #[default]
    SampleStdDev,
    /// `sqrt(var - 1)`, the figure historically reported by deployed
    /// pipelines. Undefined (and not reported) while the variance is below 1.
    Legacy,
}

impl JitterEstimator {
    pub fn estimate(self, accumulator: &RollingVariance) -> Option<f64> {
        let variance = accumulator.variance()?;
        let n = accumulator.len() as f64;
        match self {
            JitterEstimator::SampleStdDev if n < 2.0 => Some(0.0),
            JitterEstimator::SampleStdDev => Some((variance * n / (n - 1.0)).sqrt()),
            JitterEstimator::Legacy => {
                let jitter = (variance - 1.0).sqrt();
                (!jitter.is_nan()).then_some(jitter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filled(samples: &[f64]) -> RollingVariance {
        let mut acc = RollingVariance::default();
        samples.iter().for_each(|s| acc.push(*s));
        acc
    }

    #[test]
    fn empty_accumulator_has_no_estimate() {
        let acc = RollingVariance::default();
        assert_eq!(acc.variance(), None);
        assert_eq!(JitterEstimator::SampleStdDev.estimate(&acc), None);
    }

    #[test]
    fn sample_std_dev_of_known_series() {
        let acc = filled(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(acc.variance(), Some(4.0));
        let jitter = JitterEstimator::SampleStdDev.estimate(&acc).unwrap();
        assert!((jitter - (4.0f64 * 8.0 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_sample_has_zero_jitter() {
        assert_eq!(JitterEstimator::SampleStdDev.estimate(&filled(&[40.0])), Some(0.0));
    }

    #[test]
    fn legacy_formula_skips_small_variance() {
        assert_eq!(JitterEstimator::Legacy.estimate(&filled(&[40.0, 40.0])), None);
        let spread = filled(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(JitterEstimator::Legacy.estimate(&spread), Some(3f64.sqrt()));
    }

    #[test]
    fn window_evicts_oldest_samples() {
        let mut acc = RollingVariance::new(3);
        for s in [100.0, 1.0, 1.0, 1.0] {
            acc.push(s);
        }
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.variance(), Some(0.0));
    }

    #[test]
    fn estimator_parses_from_yaml() {
        let estimator: JitterEstimator = serde_yaml_ng::from_str("legacy").unwrap();
        assert_eq!(estimator, JitterEstimator::Legacy);
    }

    proptest! {
        #[test]
        fn matches_naive_variance_of_tail(
            samples in prop::collection::vec(0.0f64..1000.0, 1..100)
        ) {
            let acc = filled(&samples);
            let tail = &samples[samples.len().saturating_sub(DEFAULT_WINDOW)..];
            let mean = tail.iter().sum::<f64>() / tail.len() as f64;
            let squares = tail.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>();
            let naive = squares / tail.len() as f64;

            prop_assert_eq!(acc.len(), tail.len());
            prop_assert!((acc.variance().unwrap() - naive).abs() < 1e-6);
        }
    }
}
