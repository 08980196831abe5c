//! Choosing between the data-ready line and fixed-rate polling.

use std::fmt::Display;

use fallwatch_config::SensorMode;
use fallwatch_traits::ImuSource;
use fallwatch_traits::clock::Clock;

use crate::paced::Paced;

/// How a hardware source gets paced once it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// Block on the data-ready line for each sample.
    Interrupt,
    /// Sleep one sample period, then read.
    Polling,
}

impl Acquisition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Acquisition::Interrupt => "interrupt",
            Acquisition::Polling => "polling",
        }
    }
}

/// Open the data-ready line when `mode` asks for one.
///
/// A line that fails to open is not fatal: the source falls back to polling
/// and the caller paces it. `open_line` is not called in polling mode.
pub fn open_data_ready<L, E: Display>(
    mode: SensorMode,
    open_line: impl FnOnce() -> Result<L, E>,
) -> (Acquisition, Option<L>) {
    match mode {
        SensorMode::Polling => (Acquisition::Polling, None),
        SensorMode::Interrupt => match open_line() {
            Ok(line) => (Acquisition::Interrupt, Some(line)),
            Err(e) => {
                tracing::warn!(error = %e, "data-ready line unavailable; falling back to polling");
                (Acquisition::Polling, None)
            }
        },
    }
}

/// Box `source` as is, or behind [`Paced`] when it has to be polled.
pub fn pace_if_polling<S, C>(
    source: S,
    acquisition: Acquisition,
    sample_rate_hz: u32,
    clock: C,
) -> Box<dyn ImuSource>
where
    S: ImuSource + 'static,
    C: Clock + 'static,
{
    match acquisition {
        Acquisition::Interrupt => Box::new(source),
        Acquisition::Polling => Box::new(Paced::new(source, sample_rate_hz, clock)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplaySource;
    use fallwatch_traits::clock::test_clock::TestClock;
    use std::cell::Cell;
    use std::time::{Duration, Instant};

    fn upright(n: usize) -> ReplaySource {
        let row = fallwatch_config::TraceRow {
            t_ms: 0,
            ax: 0.0,
            ay: 0.0,
            az: 1.0,
            gx: 0.0,
            gy: 0.0,
            gz: 0.0,
        };
        ReplaySource::new(vec![row; n], Instant::now())
    }

    #[test]
    fn interrupt_mode_keeps_the_line() {
        let (acq, line) = open_data_ready(SensorMode::Interrupt, || Ok::<_, String>(16u8));
        assert_eq!(acq, Acquisition::Interrupt);
        assert_eq!(line, Some(16));
    }

    #[test]
    fn failed_line_falls_back_to_polling() {
        let (acq, line) = open_data_ready(SensorMode::Interrupt, || {
            Err::<u8, _>("gpio error: Permission denied")
        });
        assert_eq!(acq, Acquisition::Polling);
        assert!(line.is_none());
    }

    #[test]
    fn polling_mode_never_touches_the_line() {
        let called = Cell::new(false);
        let (acq, line) = open_data_ready(SensorMode::Polling, || {
            called.set(true);
            Ok::<_, String>(16u8)
        });
        assert_eq!(acq, Acquisition::Polling);
        assert!(line.is_none());
        assert!(!called.get());
    }

    #[test]
    fn fallback_source_is_paced_at_the_sample_rate() {
        let clock = TestClock::new();
        let start = clock.now();
        let (acq, _line) = open_data_ready(SensorMode::Interrupt, || Err::<(), _>("no gpio"));
        let mut src = pace_if_polling(upright(2), acq, 100, clock.clone());
        for _ in 0..2 {
            assert!(src.read(Duration::from_millis(500)).unwrap().is_some());
        }
        assert_eq!(clock.now() - start, Duration::from_millis(20));
    }

    #[test]
    fn interrupt_source_is_not_paced() {
        let clock = TestClock::new();
        let start = clock.now();
        let mut src = pace_if_polling(upright(2), Acquisition::Interrupt, 100, clock.clone());
        assert!(src.read(Duration::from_millis(500)).unwrap().is_some());
        assert_eq!(clock.now(), start);
    }
}
