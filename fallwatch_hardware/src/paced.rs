//! Polling mode: fixed sleep before every read.

use std::time::Duration;

use fallwatch_traits::clock::Clock;
use fallwatch_traits::{ImuSource, Sample, SensorError};

pub struct Paced<S, C> {
    inner: S,
    clock: C,
    period: Duration,
}

impl<S: ImuSource, C: Clock> Paced<S, C> {
    pub fn new(inner: S, sample_rate_hz: u32, clock: C) -> Self {
        let period = Duration::from_micros(1_000_000 / u64::from(sample_rate_hz.max(1)));
        tracing::debug!(period_us = period.as_micros() as u64, "polling source");
        Self {
            inner,
            clock,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ImuSource, C: Clock> ImuSource for Paced<S, C> {
    fn read(&mut self, timeout: Duration) -> Result<Option<Sample>, SensorError> {
        self.clock.sleep(self.period);
        self.inner.read(timeout)
    }

    fn is_healthy(&mut self) -> bool {
        self.inner.is_healthy()
    }

    fn reinit(&mut self) -> Result<(), SensorError> {
        self.inner.reinit()
    }
}
