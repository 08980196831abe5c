//! Replays a recorded trace through the engine.
//!
//! Rows are turned into samples stamped `base + t_ms`, so detection windows
//! see the recorded timing no matter how fast the replay runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use fallwatch_config::TraceRow;
use fallwatch_traits::{ImuSource, Sample, SensorError};

#[derive(Debug)]
pub struct ReplaySource {
    rows: VecDeque<TraceRow>,
    base: Instant,
    total: usize,
    done: Option<Arc<AtomicBool>>,
}

impl ReplaySource {
    pub fn new(rows: Vec<TraceRow>, base: Instant) -> Self {
        tracing::info!(rows = rows.len(), "replay source loaded");
        Self {
            total: rows.len(),
            rows: rows.into(),
            base,
            done: None,
        }
    }

    /// Raise `flag` once the last row has been handed out.
    pub fn with_done_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        if self.rows.is_empty() {
            flag.store(true, Ordering::Relaxed);
        }
        self.done = Some(flag);
        self
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_exhausted(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ImuSource for ReplaySource {
    fn read(&mut self, _timeout: Duration) -> Result<Option<Sample>, SensorError> {
        let Some(row) = self.rows.pop_front() else {
            return Ok(None);
        };
        if self.rows.is_empty() {
            tracing::debug!(rows = self.total, "replay finished");
            if let Some(flag) = &self.done {
                flag.store(true, Ordering::Relaxed);
            }
        }
        Ok(Some(Sample::new(
            [row.ax, row.ay, row.az],
            [row.gx, row.gy, row.gz],
            self.base + Duration::from_millis(row.t_ms),
        )))
    }

    fn is_healthy(&mut self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(t_ms: u64, az: f32) -> TraceRow {
        TraceRow {
            t_ms,
            ax: 0.0,
            ay: 0.0,
            az,
            gx: 0.0,
            gy: 0.0,
            gz: 0.0,
        }
    }

    #[test]
    fn samples_carry_recorded_offsets_and_flag_end() {
        let base = Instant::now();
        let flag = Arc::new(AtomicBool::new(false));
        let mut src =
            ReplaySource::new(vec![row(0, 1.0), row(40, 0.2)], base).with_done_flag(flag.clone());

        let a = src.read(Duration::ZERO).unwrap().unwrap();
        assert_eq!(a.t, base);
        assert!(!flag.load(Ordering::Relaxed));

        let b = src.read(Duration::ZERO).unwrap().unwrap();
        assert_eq!(b.t - base, Duration::from_millis(40));
        assert_eq!(b.az, 0.2);
        assert!(flag.load(Ordering::Relaxed));
        assert!(src.is_exhausted());
        assert_eq!(src.read(Duration::ZERO), Ok(None));
    }

    #[test]
    fn empty_trace_is_done_immediately() {
        let flag = Arc::new(AtomicBool::new(false));
        let _src = ReplaySource::new(Vec::new(), Instant::now()).with_done_flag(flag.clone());
        assert!(flag.load(Ordering::Relaxed));
    }
}
