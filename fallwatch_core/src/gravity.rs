//! Slowly adapting estimate of the gravity vector in body frame.
//!
//! The estimate is the "before" reference for posture-change checks. Callers
//! must only feed it while the detector is idle so a fall in progress never
//! leaks into its own reference.

use std::time::Duration;

use fallwatch_traits::Sample;

/// Low-pass gravity vector (g) and how many samples went into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityEstimate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub sample_count: u32,
}

impl Default for GravityEstimate {
    /// Nominal upright orientation; replaced by the first real sample.
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 1.0,
            sample_count: 0,
        }
    }
}

impl GravityEstimate {
    /// Euclidean distance to `v` (g).
    pub fn distance_to(&self, v: [f32; 3]) -> f32 {
        let dx = v[0] - self.x;
        let dy = v[1] - self.y;
        let dz = v[2] - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

#[derive(Debug, Clone)]
pub struct GravityTracker {
    estimate: GravityEstimate,
    alpha: f32,
    min_samples: u32,
}

impl GravityTracker {
    pub fn new(alpha: f32, min_samples: u32) -> Self {
        Self {
            estimate: GravityEstimate::default(),
            alpha: alpha.clamp(f32::MIN_POSITIVE, 1.0),
            min_samples,
        }
    }

    /// EMA factor whose time constant spans `window` at `hz`.
    pub fn alpha_for_window(window: Duration, hz: u32) -> f32 {
        let n = window.as_secs_f32() * hz.max(1) as f32;
        if n <= 1.0 { 1.0 } else { 1.0 / n }
    }

    /// Fold one sample into the estimate. The first sample seeds it directly.
    pub fn update(&mut self, sample: &Sample) {
        let e = &mut self.estimate;
        if e.sample_count == 0 {
            e.x = sample.ax;
            e.y = sample.ay;
            e.z = sample.az;
        } else {
            e.x += self.alpha * (sample.ax - e.x);
            e.y += self.alpha * (sample.ay - e.y);
            e.z += self.alpha * (sample.az - e.z);
        }
        e.sample_count = e.sample_count.saturating_add(1);
    }

    /// Enough samples have accumulated to trust the estimate.
    pub fn is_valid(&self) -> bool {
        self.estimate.sample_count >= self.min_samples
    }

    /// Copy of the current estimate; later updates do not touch it.
    pub fn snapshot(&self) -> GravityEstimate {
        self.estimate
    }

    pub fn estimate(&self) -> &GravityEstimate {
        &self.estimate
    }

    pub fn min_samples(&self) -> u32 {
        self.min_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn s(x: f32, y: f32, z: f32) -> Sample {
        Sample::new([x, y, z], [0.0; 3], Instant::now())
    }

    #[test]
    fn first_sample_seeds_estimate() {
        let mut g = GravityTracker::new(0.02, 3);
        g.update(&s(0.1, -0.2, 0.95));
        let e = g.snapshot();
        assert_eq!((e.x, e.y, e.z, e.sample_count), (0.1, -0.2, 0.95, 1));
    }

    #[test]
    fn valid_only_after_min_samples() {
        let mut g = GravityTracker::new(0.5, 3);
        for _ in 0..2 {
            g.update(&s(0.0, 0.0, 1.0));
        }
        assert!(!g.is_valid());
        g.update(&s(0.0, 0.0, 1.0));
        assert!(g.is_valid());
    }

    #[test]
    fn snapshot_is_detached_from_tracker() {
        let mut g = GravityTracker::new(0.5, 1);
        g.update(&s(0.0, 0.0, 1.0));
        let snap = g.snapshot();
        for _ in 0..10 {
            g.update(&s(1.0, 0.0, 0.0));
        }
        assert_eq!(snap.as_array(), [0.0, 0.0, 1.0]);
        assert!(g.estimate().x > 0.9);
    }

    #[test]
    fn ema_step_matches_formula() {
        let mut g = GravityTracker::new(0.25, 1);
        g.update(&s(0.0, 0.0, 1.0));
        g.update(&s(1.0, 0.0, 0.0));
        let e = g.snapshot();
        assert!((e.x - 0.25).abs() < 1e-6);
        assert!((e.z - 0.75).abs() < 1e-6);
    }

    #[test]
    fn alpha_for_half_second_at_100hz() {
        let a = GravityTracker::alpha_for_window(Duration::from_millis(500), 100);
        assert!((a - 0.02).abs() < 1e-6);
        assert_eq!(GravityTracker::alpha_for_window(Duration::ZERO, 100), 1.0);
    }
}
