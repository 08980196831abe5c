//! Main acquisition loop.
//!
//! `Engine` is the explicit context object of a running detector: it owns the
//! source, the detector, the sink, the watchdog and the health monitor, and
//! is driven one tick at a time. Nothing here is global; the shutdown flag is
//! passed in by the caller and checked once per tick.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use fallwatch_traits::clock::Clock;
use fallwatch_traits::{EventSink, ImuSource, SensorError, Watchdog};

use crate::config::{HealthCfg, LoopCfg};
use crate::detector::{FallDetector, SampleStatus};
use crate::error::{EngineError, Result as CoreResult};
use crate::health::{HealthMonitor, HealthVerdict};

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub samples: u64,
    pub rejected: u64,
    /// Ticks where the bounded wait expired without data.
    pub idle_ticks: u64,
    pub transient_errors: u64,
    pub fatal_errors: u64,
    pub health_failures: u64,
    pub reinits: u64,
    pub events_published: u64,
    pub events_dropped: u64,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks={} samples={} rejected={} idle={} transient={} fatal={} health_failures={} reinits={} published={} dropped={}",
            self.ticks,
            self.samples,
            self.rejected,
            self.idle_ticks,
            self.transient_errors,
            self.fatal_errors,
            self.health_failures,
            self.reinits,
            self.events_published,
            self.events_dropped,
        )
    }
}

pub struct Engine<S, K, W, C> {
    source: S,
    detector: FallDetector,
    sink: K,
    watchdog: W,
    clock: C,
    health: HealthMonitor,
    loop_cfg: LoopCfg,
    stats: RunStats,
}

impl<S, K, W, C> Engine<S, K, W, C>
where
    S: ImuSource,
    K: EventSink,
    W: Watchdog,
    C: Clock,
{
    pub fn new(
        source: S,
        detector: FallDetector,
        sink: K,
        watchdog: W,
        clock: C,
        loop_cfg: LoopCfg,
        health_cfg: HealthCfg,
    ) -> Self {
        let health = HealthMonitor::new(health_cfg, clock.now());
        Self {
            source,
            detector,
            sink,
            watchdog,
            clock,
            health,
            loop_cfg,
            stats: RunStats::default(),
        }
    }

    /// One loop iteration: bounded read, detection, housekeeping.
    ///
    /// Only an unrecoverable source (reinit failed fatally) is an error; every
    /// other I/O failure degrades to "no data this tick".
    pub fn tick(&mut self) -> Result<(), EngineError> {
        self.stats.ticks += 1;

        match self.source.read(self.loop_cfg.read_timeout) {
            Ok(Some(sample)) => {
                self.stats.samples += 1;
                match self.detector.process(&sample) {
                    SampleStatus::Rejected => self.stats.rejected += 1,
                    SampleStatus::Accepted => self.health.note_sample(self.clock.now()),
                    SampleStatus::Fall(event) => {
                        self.health.note_sample(self.clock.now());
                        tracing::info!(
                            device_id = %event.device_id,
                            severe = event.severe,
                            "fall confirmed"
                        );
                        match self.sink.publish(event) {
                            Ok(()) => self.stats.events_published += 1,
                            Err(e) => {
                                self.stats.events_dropped += 1;
                                tracing::warn!(error = %e, "fall event dropped");
                            }
                        }
                    }
                }
            }
            Ok(None) => self.stats.idle_ticks += 1,
            Err(SensorError::Transient(msg)) => {
                self.stats.transient_errors += 1;
                tracing::warn!(error = %msg, state = self.detector.state().as_str(), "sensor read failed; resetting");
                self.detector.reset();
                self.clock.sleep(self.loop_cfg.error_cooldown);
            }
            Err(SensorError::Fatal(msg)) => {
                self.stats.fatal_errors += 1;
                tracing::error!(error = %msg, "sensor fatal error");
                self.detector.reset();
                let verdict = self.health.record_failure();
                self.stats.health_failures = self.health.failures_total();
                if verdict == HealthVerdict::ReinitWarranted {
                    self.reinit_source()?;
                }
                self.clock.sleep(self.loop_cfg.error_cooldown);
            }
        }

        let now = self.clock.now();
        let verdict = self
            .health
            .tick(now, &mut self.source, &mut self.watchdog);
        self.stats.health_failures = self.health.failures_total();
        if verdict == HealthVerdict::ReinitWarranted {
            self.reinit_source()?;
        }
        Ok(())
    }

    fn reinit_source(&mut self) -> Result<(), EngineError> {
        self.stats.reinits += 1;
        tracing::warn!(
            failures = self.health.consecutive_failures(),
            "reinitializing sensor"
        );
        self.detector.reset();
        match self.source.reinit() {
            Ok(()) => {
                self.health.clear_failures(self.clock.now());
                tracing::info!("sensor reinitialized");
                Ok(())
            }
            Err(SensorError::Transient(msg)) => {
                // Failure count is kept; the next failed check tries again.
                tracing::warn!(error = %msg, "sensor reinit failed");
                Ok(())
            }
            Err(SensorError::Fatal(msg)) => Err(EngineError::SensorFatal(msg)),
        }
    }

    /// Tick until `shutdown` is set. An in-flight episode is discarded on exit.
    pub fn run_until(&mut self, shutdown: &AtomicBool) -> CoreResult<RunStats> {
        tracing::info!(
            device_id = %self.detector.device_id(),
            hz = self.loop_cfg.sample_rate_hz,
            "engine started"
        );
        while !shutdown.load(Ordering::Relaxed) {
            self.tick()?;
        }
        if self.detector.state() != crate::machine::FallState::Idle {
            tracing::info!(
                state = self.detector.state().as_str(),
                "shutdown discards in-progress episode"
            );
            self.detector.reset();
        }
        tracing::info!(stats = %self.stats, "engine stopped");
        Ok(self.stats.clone())
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn detector(&self) -> &FallDetector {
        &self.detector
    }

    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Tear down, returning the sink so callers can flush or inspect it.
    pub fn into_sink(self) -> K {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingSink, ScriptedSource};
    use fallwatch_traits::NoopWatchdog;
    use fallwatch_traits::clock::test_clock::TestClock;
    use std::time::Duration;

    fn detector() -> FallDetector {
        FallDetector::builder()
            .with_device_id("unit")
            .build()
            .unwrap()
    }

    #[test]
    fn stats_display_is_single_line() {
        let s = RunStats {
            ticks: 3,
            ..RunStats::default()
        };
        let line = s.to_string();
        assert!(line.starts_with("ticks=3 "));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn fatal_reinit_failure_stops_engine() {
        let clock = TestClock::new();
        let mut src = ScriptedSource::new();
        for _ in 0..3 {
            src.push_err(SensorError::Fatal("gone".into()));
        }
        src.set_reinit_result(Err(SensorError::Fatal("no ack".into())));
        let mut engine = Engine::new(
            src,
            detector(),
            RecordingSink::default(),
            NoopWatchdog,
            clock.clone(),
            LoopCfg::default(),
            HealthCfg {
                reinit_after_failures: 3,
                ..HealthCfg::default()
            },
        );
        engine.tick().unwrap();
        engine.tick().unwrap();
        assert_eq!(
            engine.tick(),
            Err(EngineError::SensorFatal("no ack".into()))
        );
        assert_eq!(engine.stats().fatal_errors, 3);
        assert_eq!(engine.stats().reinits, 1);
        // two cooldowns on the test clock; the third tick bails before sleeping
        assert!(clock.ms_since(clock.at(Duration::ZERO)) >= 2000);
    }
}
