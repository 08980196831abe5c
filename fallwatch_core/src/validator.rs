//! Plausibility gate in front of the state machine.

use fallwatch_traits::Sample;

/// Default minimum for `|ax|+|ay|+|az|` (g). Gravity alone keeps a live
/// sensor well above this on every orientation.
pub const DEFAULT_MIN_ACCEL_SUM: f32 = 0.05;

/// Drops samples a working sensor cannot produce: all-axis near-zero
/// acceleration (stuck or unplugged part) and non-finite values.
#[derive(Debug, Clone)]
pub struct SampleValidator {
    min_accel_sum: f32,
    rejected: u64,
}

impl Default for SampleValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ACCEL_SUM)
    }
}

impl SampleValidator {
    pub fn new(min_accel_sum: f32) -> Self {
        Self {
            min_accel_sum,
            rejected: 0,
        }
    }

    /// `true` when the sample may reach the state machine.
    pub fn accept(&mut self, sample: &Sample) -> bool {
        let finite = [
            sample.ax, sample.ay, sample.az, sample.gx, sample.gy, sample.gz,
        ]
        .iter()
        .all(|v| v.is_finite());
        if finite && sample.accel_abs_sum() >= self.min_accel_sum {
            return true;
        }
        self.rejected = self.rejected.saturating_add(1);
        tracing::debug!(
            accel_sum = sample.accel_abs_sum(),
            rejected = self.rejected,
            "dropping implausible sample"
        );
        false
    }

    /// Samples dropped since construction.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
