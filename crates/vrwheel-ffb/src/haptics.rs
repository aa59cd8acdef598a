//! Vibration estimate from the smoothed force history
//!
//! Rumble-style effects show up as fast sign changes in the centering force.
//! The estimator measures the RMS of the sample-to-sample derivative over a
//! short window and maps it to a controller vibration intensity.

use serde::{Deserialize, Serialize};

use crate::constants::ESTIMATOR_WINDOW;
use crate::history::SmoothedHistory;

/// Tuning of [`HapticEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticEstimatorConfig {
    /// Samples inspected, newest first
    pub window: usize,
    /// Derivative RMS below which no vibration is produced
    pub threshold: f32,
    /// Intensity per unit of derivative RMS, capped at `1.0`
    pub gain: f32,
}

impl Default for HapticEstimatorConfig {
    fn default() -> Self {
        Self {
            window: ESTIMATOR_WINDOW,
            threshold: 0.01,
            gain: 10.0,
        }
    }
}

/// Derived vibration for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HapticEstimate {
    pub derivative_rms: f32,
    /// `0.0..=1.0`
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HapticEstimator {
    config: HapticEstimatorConfig,
}

impl HapticEstimator {
    pub fn new(config: HapticEstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HapticEstimatorConfig {
        &self.config
    }

    /// Estimate vibration, or `None` if the history is too short or too calm.
    pub fn estimate(&self, history: &SmoothedHistory) -> Option<HapticEstimate> {
        let mut previous: Option<f32> = None;
        let mut sum_sq = 0.0f32;
        let mut diffs = 0u32;
        for sample in history.recent(self.config.window) {
            if let Some(prev) = previous {
                let d = sample - prev;
                sum_sq += d * d;
                diffs += 1;
            }
            previous = Some(sample);
        }
        if diffs == 0 {
            return None;
        }

        #[expect(clippy::cast_precision_loss, reason = "window is at most a few dozen samples")]
        let derivative_rms = (sum_sq / diffs as f32).sqrt();
        if !derivative_rms.is_finite() || derivative_rms < self.config.threshold {
            return None;
        }
        Some(HapticEstimate {
            derivative_rms,
            intensity: (derivative_rms * self.config.gain).clamp(0.0, 1.0),
        })
    }
}
