//! Each simulated scenario, run through the real detector for one loop.

use fallwatch_core::FallDetector;
use fallwatch_hardware::{Paced, ReplaySource, Scenario, SimulatedImu};
use fallwatch_traits::ImuSource;
use fallwatch_traits::clock::Clock;
use fallwatch_traits::clock::test_clock::TestClock;
use rstest::rstest;
use std::time::{Duration, Instant};

fn outcomes(scenario: Scenario) -> Vec<bool> {
    let clock = TestClock::new();
    let mut imu = SimulatedImu::new(scenario, 100, clock.clone());
    let mut det = FallDetector::builder()
        .with_device_id("sim")
        .with_clock(clock.clone())
        .build()
        .unwrap();
    let end = clock.now() + imu.cycle();
    let mut severities = Vec::new();
    while clock.now() < end {
        let s = imu.read(Duration::from_millis(500)).unwrap().unwrap();
        if let Some(ev) = det.process(&s).into_event() {
            severities.push(ev.severe);
        }
    }
    severities
}

#[rstest]
#[case::severe(Scenario::Severe, vec![true])]
#[case::mild(Scenario::Mild, vec![false])]
#[case::stumble(Scenario::Stumble, vec![])]
#[case::dip(Scenario::Dip, vec![])]
#[case::idle(Scenario::Idle, vec![])]
fn scenario_outcomes(#[case] scenario: Scenario, #[case] expected: Vec<bool>) {
    assert_eq!(outcomes(scenario), expected);
}

#[test]
fn replayed_recording_matches_live_detection() {
    // Record the severe scenario, then replay it as CSV rows through a paced source.
    let clock = TestClock::new();
    let start = clock.now();
    let mut imu = SimulatedImu::new(Scenario::Severe, 100, clock.clone());
    let mut csv = String::from("t_ms,ax,ay,az,gx,gy,gz\n");
    for _ in 0..600 {
        let s = imu.read(Duration::ZERO).unwrap().unwrap();
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            (s.t - start).as_millis(),
            s.ax,
            s.ay,
            s.az,
            s.gx,
            s.gy,
            s.gz
        ));
    }
    let rows = fallwatch_config::parse_trace(csv.as_bytes()).unwrap();
    assert_eq!(rows.len(), 600);

    let replay_clock = TestClock::new();
    let mut src = Paced::new(
        ReplaySource::new(rows, Instant::now()),
        100,
        replay_clock.clone(),
    );
    let mut det = FallDetector::builder().with_device_id("replay").build().unwrap();
    let mut events = 0;
    while let Some(s) = src.read(Duration::ZERO).unwrap() {
        if det.process(&s).into_event().is_some() {
            events += 1;
        }
    }
    assert_eq!(events, 1);
    assert_eq!(
        replay_clock.now() - replay_clock.at(Duration::ZERO),
        Duration::from_millis(6010)
    );
}
