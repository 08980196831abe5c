//! Periodic sensor self-check and watchdog pacing.
//!
//! Runs on the loop tick but on its own intervals, independent of whether a
//! sample arrived. A failed identity probe or a stalled sample stream counts
//! as one failure; enough consecutive failures ask the loop to reinitialize
//! the source.

use std::time::Instant;

use fallwatch_traits::{ImuSource, Watchdog};

use crate::config::HealthCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    /// No check was due this tick.
    NotDue,
    Healthy,
    Unhealthy { consecutive: u32 },
    /// Consecutive failures reached the configured limit.
    ReinitWarranted,
}

#[derive(Debug)]
pub struct HealthMonitor {
    cfg: HealthCfg,
    last_check: Instant,
    last_ping: Instant,
    last_sample_at: Instant,
    consecutive: u32,
    failures_total: u64,
}

impl HealthMonitor {
    pub fn new(cfg: HealthCfg, now: Instant) -> Self {
        Self {
            cfg,
            last_check: now,
            last_ping: now,
            last_sample_at: now,
            consecutive: 0,
            failures_total: 0,
        }
    }

    /// A valid sample arrived at `now`.
    pub fn note_sample(&mut self, now: Instant) {
        self.last_sample_at = now;
    }

    /// Time since the last valid sample.
    pub fn stalled_for(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.last_sample_at)
    }

    /// Ping the watchdog and run the self-check when their intervals elapse.
    pub fn tick<S, W>(&mut self, now: Instant, source: &mut S, watchdog: &mut W) -> HealthVerdict
    where
        S: ImuSource + ?Sized,
        W: Watchdog + ?Sized,
    {
        if now.saturating_duration_since(self.last_ping) >= self.cfg.watchdog_interval {
            watchdog.ping();
            self.last_ping = now;
        }

        if now.saturating_duration_since(self.last_check) < self.cfg.check_interval {
            return HealthVerdict::NotDue;
        }
        self.last_check = now;

        let stalled = self.stalled_for(now);
        if stalled > self.cfg.stall_threshold {
            tracing::warn!(stalled_ms = stalled.as_millis() as u64, "sensor stalled");
            return self.record_failure();
        }
        if !source.is_healthy() {
            tracing::warn!("sensor health check failed");
            return self.record_failure();
        }
        if self.consecutive > 0 {
            tracing::info!(after = self.consecutive, "sensor healthy again");
        }
        self.consecutive = 0;
        HealthVerdict::Healthy
    }

    /// Count one failure (failed probe, stall, or fatal read).
    pub fn record_failure(&mut self) -> HealthVerdict {
        self.consecutive = self.consecutive.saturating_add(1);
        self.failures_total = self.failures_total.saturating_add(1);
        if self.consecutive >= self.cfg.reinit_after_failures {
            HealthVerdict::ReinitWarranted
        } else {
            HealthVerdict::Unhealthy {
                consecutive: self.consecutive,
            }
        }
    }

    /// Start counting afresh after the source was reinitialized.
    pub fn clear_failures(&mut self, now: Instant) {
        self.consecutive = 0;
        self.last_sample_at = now;
    }

    pub fn failures_total(&self) -> u64 {
        self.failures_total
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }
}
