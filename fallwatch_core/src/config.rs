//! Runtime configuration for the detection engine.
//!
//! These are the value objects the core runs on. They are separate from the
//! TOML-deserialized config in `fallwatch_config`; see `conversions`.

use std::time::Duration;

use crate::error::BuildError;

/// Upper bound for every threshold duration; keeps `Instant` arithmetic in range.
pub const MAX_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Detection thresholds. Immutable for the lifetime of a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Enter free fall when |accel| drops below this (g).
    pub freefall_g: f32,
    /// Impact when |accel| exceeds this (g)...
    pub impact_g: f32,
    /// ...or |gyro| exceeds this (deg/s).
    pub impact_gyro_dps: f32,
    /// Post-impact ticks above this angular rate count as movement (deg/s).
    pub inactivity_gyro_dps: f32,
    pub inactivity_period: Duration,
    /// Max fraction of moving ticks for the wearer to count as motionless.
    pub allowed_motion_frac: f32,
    /// Min distance between averaged post-impact accel and pre-event gravity (g).
    pub posture_change_g: f32,
    /// Ringing window skipped right after impact.
    pub stabilization: Duration,
    /// Max time from free-fall onset to impact.
    pub freefall_window: Duration,
    /// Debounce between evaluated events.
    pub min_event_interval: Duration,
    pub gravity_alpha: f32,
    /// Gravity estimate is untrusted until this many idle samples were folded in.
    pub gravity_min_samples: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        (&fallwatch_config::Preset::default().values()).into()
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), BuildError> {
        let positive = [
            self.freefall_g,
            self.impact_g,
            self.impact_gyro_dps,
            self.inactivity_gyro_dps,
            self.posture_change_g,
        ];
        if positive.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(BuildError::InvalidThresholds(
                "accel/gyro thresholds must be finite and > 0",
            ));
        }
        if self.impact_g <= self.freefall_g {
            return Err(BuildError::InvalidThresholds(
                "impact_g must exceed freefall_g",
            ));
        }
        if !(0.0..=1.0).contains(&self.allowed_motion_frac) {
            return Err(BuildError::InvalidThresholds(
                "allowed_motion_frac must be in [0, 1]",
            ));
        }
        if !(self.gravity_alpha > 0.0 && self.gravity_alpha <= 1.0) {
            return Err(BuildError::InvalidThresholds(
                "gravity_alpha must be in (0, 1]",
            ));
        }
        if self.inactivity_period.is_zero() || self.freefall_window.is_zero() {
            return Err(BuildError::InvalidThresholds(
                "inactivity_period and freefall_window must be > 0",
            ));
        }
        let windows = [
            self.inactivity_period,
            self.stabilization,
            self.freefall_window,
            self.min_event_interval,
        ];
        if windows.iter().any(|d| *d > MAX_WINDOW) {
            return Err(BuildError::InvalidThresholds(
                "time windows are unreasonably large (>1h)",
            ));
        }
        Ok(())
    }
}

/// Acquisition timing for the main loop.
#[derive(Debug, Clone)]
pub struct LoopCfg {
    /// Nominal output data rate; sizes the inactivity buffer.
    pub sample_rate_hz: u32,
    /// Max wait for data-ready per tick.
    pub read_timeout: Duration,
    /// Sleep after a sensor error before the next read.
    pub error_cooldown: Duration,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100,
            read_timeout: Duration::from_millis(500),
            error_cooldown: Duration::from_secs(1),
        }
    }
}

/// Housekeeping cadence for the health monitor.
#[derive(Debug, Clone)]
pub struct HealthCfg {
    pub check_interval: Duration,
    pub watchdog_interval: Duration,
    pub reinit_after_failures: u32,
    /// No valid sample for this long fails the next health check.
    pub stall_threshold: Duration,
}

impl Default for HealthCfg {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(10),
            watchdog_interval: Duration::from_secs(5),
            reinit_after_failures: 3,
            stall_threshold: Duration::from_millis(crate::util::stall_threshold_ms(500, 100)),
        }
    }
}
