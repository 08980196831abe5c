//! Test and helper mocks for fallwatch_core.
//!
//! Hardware-free collaborators for driving the detector and the engine:
//! a scripted source, recording and failing sinks, and a builder for
//! synthetic sample traces.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fallwatch_traits::{EventSink, FallEvent, ImuSource, PublishError, Sample, SensorError, Watchdog};

type ReadOutcome = Result<Option<Sample>, SensorError>;

/// Source that replays a fixed list of read outcomes.
///
/// Once drained it returns `Ok(None)` and, if configured, raises the
/// shutdown flag so `Engine::run_until` ends on its own.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<ReadOutcome>,
    healthy: bool,
    reinit_result: Option<Result<(), SensorError>>,
    reinit_calls: u32,
    stop_when_drained: Option<Arc<AtomicBool>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut s = Self::new();
        s.script.extend(samples.into_iter().map(|x| Ok(Some(x))));
        s
    }

    pub fn push_sample(&mut self, sample: Sample) {
        self.script.push_back(Ok(Some(sample)));
    }

    pub fn push_idle(&mut self) {
        self.script.push_back(Ok(None));
    }

    pub fn push_err(&mut self, err: SensorError) {
        self.script.push_back(Err(err));
    }

    pub fn set_healthy(&mut self, healthy: bool) {
        self.healthy = healthy;
    }

    pub fn set_reinit_result(&mut self, r: Result<(), SensorError>) {
        self.reinit_result = Some(r);
    }

    pub fn stop_when_drained(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_when_drained = Some(flag);
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    pub fn reinit_calls(&self) -> u32 {
        self.reinit_calls
    }
}

impl ImuSource for ScriptedSource {
    fn read(&mut self, _timeout: Duration) -> Result<Option<Sample>, SensorError> {
        let next = self.script.pop_front().unwrap_or(Ok(None));
        if let Some(flag) = self.stop_when_drained.as_ref().filter(|_| self.script.is_empty()) {
            flag.store(true, Ordering::Relaxed);
        }
        next
    }

    fn is_healthy(&mut self) -> bool {
        self.healthy
    }

    fn reinit(&mut self) -> Result<(), SensorError> {
        self.reinit_calls += 1;
        self.reinit_result.clone().unwrap_or(Ok(()))
    }
}

/// Sink that keeps every published event. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<FallEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<FallEvent> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn publish(&mut self, event: FallEvent) -> Result<(), PublishError> {
        match self.events.lock() {
            Ok(mut v) => {
                v.push(event);
                Ok(())
            }
            Err(_) => Err(PublishError::Delivery("recording sink poisoned".into())),
        }
    }
}

/// Sink whose delivery always fails.
#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    pub attempts: u32,
}

impl EventSink for FailingSink {
    fn publish(&mut self, _event: FallEvent) -> Result<(), PublishError> {
        self.attempts += 1;
        Err(PublishError::Delivery("uplink unreachable".into()))
    }
}

/// Watchdog that counts pings.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingWatchdog {
    pub pings: u32,
}

impl Watchdog for CountingWatchdog {
    fn ping(&mut self) {
        self.pings += 1;
    }
}

/// Earth gravity along +z, at rest.
pub const REST: [f32; 3] = [0.0, 0.0, 1.0];
pub const STILL: [f32; 3] = [0.0, 0.0, 0.0];

/// Builds evenly spaced sample sequences segment by segment.
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    t: Instant,
    period: Duration,
    samples: Vec<Sample>,
}

impl TraceBuilder {
    pub fn new(start: Instant, hz: u32) -> Self {
        Self {
            t: start,
            period: Duration::from_micros(crate::util::period_us(hz)),
            samples: Vec::new(),
        }
    }

    /// Timestamp the next sample will carry.
    pub fn now(&self) -> Instant {
        self.t
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// A single sample.
    pub fn tick(mut self, accel: [f32; 3], gyro: [f32; 3]) -> Self {
        self.samples.push(Sample::new(accel, gyro, self.t));
        self.t += self.period;
        self
    }

    /// Constant readings for `dur`.
    pub fn hold(self, dur: Duration, accel: [f32; 3], gyro: [f32; 3]) -> Self {
        self.hold_with(dur, |_| (accel, gyro))
    }

    /// Readings for `dur` produced per tick index.
    pub fn hold_with(
        mut self,
        dur: Duration,
        mut f: impl FnMut(usize) -> ([f32; 3], [f32; 3]),
    ) -> Self {
        let n = crate::util::ticks_in(dur, self.hz());
        for i in 0..n {
            let (a, g) = f(i);
            self = self.tick(a, g);
        }
        self
    }

    /// Skip ahead without producing samples.
    pub fn gap(mut self, dur: Duration) -> Self {
        self.t += dur;
        self
    }

    pub fn build(self) -> Vec<Sample> {
        self.samples
    }

    fn hz(&self) -> u32 {
        let us = self.period.as_micros().max(1);
        u32::try_from(1_000_000 / us).unwrap_or(u32::MAX).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_builder_spaces_samples_by_period() {
        let t0 = Instant::now();
        let trace = TraceBuilder::new(t0, 100)
            .hold(Duration::from_millis(50), REST, STILL)
            .tick([0.0, 0.0, 4.0], STILL)
            .build();
        assert_eq!(trace.len(), 6);
        assert_eq!(trace[5].t - t0, Duration::from_millis(50));
        assert_eq!(trace[5].az, 4.0);
    }

    #[test]
    fn scripted_source_raises_flag_when_drained() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut src = ScriptedSource::new().stop_when_drained(flag.clone());
        src.push_idle();
        src.push_err(SensorError::Transient("nack".into()));
        assert_eq!(src.read(Duration::ZERO), Ok(None));
        assert!(!flag.load(Ordering::Relaxed));
        assert!(src.read(Duration::ZERO).is_err());
        assert!(flag.load(Ordering::Relaxed));
        assert_eq!(src.read(Duration::ZERO), Ok(None));
    }
}
