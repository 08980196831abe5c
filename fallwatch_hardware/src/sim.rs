//! Scripted IMU for hardware-free runs.
//!
//! Each scenario is a looped timeline of segments (standing, free fall,
//! impact, aftermath). `read` waits one output period on the supplied clock,
//! then returns the segment's reading for the current time plus a little
//! deterministic noise.

use std::time::{Duration, Instant};

use fallwatch_traits::clock::Clock;
use fallwatch_traits::{ImuSource, Sample, SensorError};

const UPRIGHT: [f32; 3] = [0.0, 0.0, 1.0];
const ON_SIDE: [f32; 3] = [1.0, 0.0, 0.0];
const WEIGHTLESS: [f32; 3] = [0.0, 0.0, 0.15];
const SPIKE: [f32; 3] = [0.5, 0.0, 4.5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Fall, then lying still on the side.
    Severe,
    /// Fall, then lying on the side but moving.
    Mild,
    /// Fall and impact, then back upright.
    Stumble,
    /// Brief free fall, no impact.
    Dip,
    /// Standing still.
    Idle,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::Severe,
        Scenario::Mild,
        Scenario::Stumble,
        Scenario::Dip,
        Scenario::Idle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Severe => "severe",
            Scenario::Mild => "mild",
            Scenario::Stumble => "stumble",
            Scenario::Dip => "dip",
            Scenario::Idle => "idle",
        }
    }

    fn timeline(self) -> Vec<Segment> {
        let ms = Duration::from_millis;
        let mut t = vec![Segment::still(ms(2000), UPRIGHT)];
        match self {
            Scenario::Idle => return vec![Segment::still(ms(10_000), UPRIGHT)],
            Scenario::Dip => {
                t.push(Segment::still(ms(300), WEIGHTLESS));
                t.push(Segment::still(ms(9000), UPRIGHT));
                return t;
            }
            _ => {}
        }
        t.push(Segment::still(ms(300), WEIGHTLESS));
        t.push(Segment {
            dur: ms(20),
            accel: SPIKE,
            gyro: [0.0, 400.0, 0.0],
            restless: false,
        });
        t.push(match self {
            Scenario::Severe => Segment::still(ms(3000), ON_SIDE),
            Scenario::Mild => Segment {
                dur: ms(3000),
                accel: ON_SIDE,
                gyro: [0.0, 0.0, 60.0],
                restless: true,
            },
            _ => Segment::still(ms(3000), UPRIGHT),
        });
        // Long enough for the debounce to clear before the next loop.
        t.push(Segment::still(ms(6000), UPRIGHT));
        t
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scenario '{s}' (severe|mild|stumble|dip|idle)"))
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    dur: Duration,
    accel: [f32; 3],
    gyro: [f32; 3],
    /// Gyro reading applies on every other tick only.
    restless: bool,
}

impl Segment {
    fn still(dur: Duration, accel: [f32; 3]) -> Self {
        Self {
            dur,
            accel,
            gyro: [0.0; 3],
            restless: false,
        }
    }
}

pub struct SimulatedImu<C: Clock> {
    scenario: Scenario,
    timeline: Vec<Segment>,
    cycle: Duration,
    clock: C,
    period: Duration,
    started: Instant,
    ticks: u64,
    noise_state: u32,
    healthy: bool,
}

impl<C: Clock> SimulatedImu<C> {
    pub fn new(scenario: Scenario, sample_rate_hz: u32, clock: C) -> Self {
        let timeline = scenario.timeline();
        let cycle = timeline.iter().map(|s| s.dur).sum();
        let started = clock.now();
        tracing::info!(scenario = scenario.as_str(), "simulated IMU ready");
        Self {
            scenario,
            timeline,
            cycle,
            period: Duration::from_micros(1_000_000 / u64::from(sample_rate_hz.max(1))),
            clock,
            started,
            ticks: 0,
            noise_state: 0xC0FFEE,
            healthy: true,
        }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Length of one loop of the scenario.
    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    /// Make `is_healthy` fail, as a part dropping off the bus would.
    pub fn set_healthy(&mut self, healthy: bool) {
        self.healthy = healthy;
    }

    fn segment_at(&self, elapsed: Duration) -> &Segment {
        let cycle_ns = self.cycle.as_nanos().max(1);
        let mut offset = Duration::from_nanos((elapsed.as_nanos() % cycle_ns) as u64);
        for seg in &self.timeline {
            if offset < seg.dur {
                return seg;
            }
            offset -= seg.dur;
        }
        &self.timeline[self.timeline.len() - 1]
    }

    // xorshift, uniform in [-1, 1)
    fn noise(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x as f32) / (u32::MAX as f32 + 1.0) * 2.0 - 1.0
    }
}

impl<C: Clock> ImuSource for SimulatedImu<C> {
    fn read(&mut self, _timeout: Duration) -> Result<Option<Sample>, SensorError> {
        // Output data rate pacing stands in for the data-ready wait.
        self.clock.sleep(self.period);
        let now = self.clock.now();
        let seg = *self.segment_at(now.saturating_duration_since(self.started));
        self.ticks += 1;

        let moving = !seg.restless || self.ticks % 2 == 0;
        let gyro = if moving { seg.gyro } else { [0.0; 3] };
        let accel = [
            seg.accel[0] + 0.01 * self.noise(),
            seg.accel[1] + 0.01 * self.noise(),
            seg.accel[2] + 0.01 * self.noise(),
        ];
        let gyro = [
            gyro[0] + 0.5 * self.noise(),
            gyro[1] + 0.5 * self.noise(),
            gyro[2] + 0.5 * self.noise(),
        ];
        Ok(Some(Sample::new(accel, gyro, now)))
    }

    fn is_healthy(&mut self) -> bool {
        self.healthy
    }

    fn reinit(&mut self) -> Result<(), SensorError> {
        tracing::info!("simulated IMU reinitialized");
        self.healthy = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fallwatch_traits::clock::test_clock::TestClock;

    #[test]
    fn scenario_names_round_trip() {
        for sc in Scenario::ALL {
            assert_eq!(sc.as_str().parse::<Scenario>(), Ok(sc));
        }
        assert!("cartwheel".parse::<Scenario>().is_err());
    }

    #[test]
    fn read_advances_clock_by_one_period() {
        let clock = TestClock::new();
        let start = clock.now();
        let mut imu = SimulatedImu::new(Scenario::Idle, 100, clock.clone());
        let s = imu.read(Duration::from_millis(500)).unwrap().unwrap();
        assert_eq!(s.t - start, Duration::from_millis(10));
        assert!((s.accel_magnitude() - 1.0).abs() < 0.05);
    }

    #[test]
    fn timeline_loops() {
        let clock = TestClock::new();
        let imu = SimulatedImu::new(Scenario::Severe, 100, clock);
        let cycle = imu.cycle();
        assert_eq!(cycle, Duration::from_millis(11_320));
        // free-fall segment in the first and second loop
        assert_eq!(imu.segment_at(Duration::from_millis(2100)).accel, WEIGHTLESS);
        assert_eq!(
            imu.segment_at(cycle + Duration::from_millis(2100)).accel,
            WEIGHTLESS
        );
    }
}
