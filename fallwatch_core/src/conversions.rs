//! `From` implementations bridging `fallwatch_config` types to `fallwatch_core` types.

use std::time::Duration;

use crate::config::{HealthCfg, LoopCfg, Thresholds};
use crate::util::stall_threshold_ms;

// ── Thresholds ───────────────────────────────────────────────────────────────

impl From<&fallwatch_config::ThresholdValues> for Thresholds {
    fn from(c: &fallwatch_config::ThresholdValues) -> Self {
        Self {
            freefall_g: c.freefall_g,
            impact_g: c.impact_g,
            impact_gyro_dps: c.impact_gyro_dps,
            inactivity_gyro_dps: c.inactivity_gyro_dps,
            inactivity_period: Duration::from_millis(c.inactivity_period_ms),
            allowed_motion_frac: c.allowed_motion_frac,
            posture_change_g: c.posture_change_g,
            stabilization: Duration::from_millis(c.stabilization_ms),
            freefall_window: Duration::from_millis(c.freefall_window_ms),
            min_event_interval: Duration::from_millis(c.min_event_interval_ms),
            gravity_alpha: c.gravity_alpha,
            gravity_min_samples: c.gravity_min_samples,
        }
    }
}

impl From<&fallwatch_config::ThresholdsCfg> for Thresholds {
    fn from(c: &fallwatch_config::ThresholdsCfg) -> Self {
        (&c.resolve()).into()
    }
}

// ── LoopCfg ──────────────────────────────────────────────────────────────────

impl From<&fallwatch_config::SensorCfg> for LoopCfg {
    fn from(c: &fallwatch_config::SensorCfg) -> Self {
        Self {
            sample_rate_hz: c.sample_rate_hz,
            read_timeout: Duration::from_millis(c.read_timeout_ms),
            error_cooldown: Duration::from_millis(c.error_cooldown_ms),
        }
    }
}

// ── HealthCfg ────────────────────────────────────────────────────────────────

impl From<&fallwatch_config::Config> for HealthCfg {
    fn from(c: &fallwatch_config::Config) -> Self {
        let stall_ms = if c.health.stall_ms == 0 {
            stall_threshold_ms(c.sensor.read_timeout_ms, c.sensor.sample_rate_hz)
        } else {
            c.health.stall_ms
        };
        Self {
            check_interval: Duration::from_millis(c.health.check_interval_ms),
            watchdog_interval: Duration::from_millis(c.health.watchdog_interval_ms),
            reinit_after_failures: c.health.reinit_after_failures,
            stall_threshold: Duration::from_millis(stall_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_follow_default_preset() {
        let t = Thresholds::default();
        assert_eq!(t.freefall_g, 0.4);
        assert_eq!(t.impact_g, 3.0);
        assert_eq!(t.inactivity_period, Duration::from_secs(2));
        assert_eq!(t.min_event_interval, Duration::from_secs(5));
        assert_eq!(t.gravity_min_samples, 50);
    }

    #[test]
    fn health_stall_is_derived_when_unset() {
        let cfg = fallwatch_config::load_toml("[sensor]\nread_timeout_ms = 100").unwrap();
        let h: HealthCfg = (&cfg).into();
        assert_eq!(h.stall_threshold, Duration::from_millis(400));

        let cfg = fallwatch_config::load_toml("[health]\nstall_ms = 750").unwrap();
        let h: HealthCfg = (&cfg).into();
        assert_eq!(h.stall_threshold, Duration::from_millis(750));
    }
}
