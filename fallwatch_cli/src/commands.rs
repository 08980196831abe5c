//! Subcommand implementations: wiring config, source, sink and watchdog into
//! an `Engine` and reporting the outcome.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use fallwatch_config::Config;
use fallwatch_core::{BuildError, Engine, EngineError, FallDetector, QueuedSink, RunStats};
use fallwatch_hardware::{ReplaySource, Scenario, SimulatedImu};
use fallwatch_traits::clock::MonotonicClock;
use fallwatch_traits::{ImuSource, NoopWatchdog};
use serde_json::json;

use crate::cli::{JSON_MODE, RtArgs};
use crate::events::{JsonLinesSink, open_output};
use crate::rt::setup_rt_once;
use crate::watchdog::NotifyWatchdog;

pub fn build_detector(cfg: &Config) -> Result<FallDetector, BuildError> {
    FallDetector::builder()
        .with_device_id(cfg.device.id.clone())
        .with_thresholds((&cfg.thresholds).into())
        .with_sample_rate_hz(cfg.sensor.sample_rate_hz)
        .with_min_valid_accel_sum(cfg.sensor.min_valid_accel_sum)
        .with_clock(MonotonicClock::new())
        .build()
}

/// Shutdown flag raised by Ctrl-C / SIGTERM.
fn shutdown_flag() -> eyre::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| eyre::eyre!("install signal handler: {e}"))?;
    Ok(flag)
}

fn stop_after(flag: Arc<AtomicBool>, after: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(after);
        flag.store(true, Ordering::Relaxed);
    });
}

fn open_source(
    cfg: &Config,
    scenario: Option<Scenario>,
    clock: MonotonicClock,
) -> eyre::Result<Box<dyn ImuSource>> {
    match scenario {
        Some(sc) => Ok(Box::new(SimulatedImu::new(
            sc,
            cfg.sensor.sample_rate_hz,
            clock,
        ))),
        None => open_hardware(cfg, clock),
    }
}

#[cfg(feature = "hardware")]
fn open_hardware(cfg: &Config, clock: MonotonicClock) -> eyre::Result<Box<dyn ImuSource>> {
    use fallwatch_hardware::{I2cImu, pace_if_polling};

    if let Some(reason) = cfg.preset_sensor_mismatch() {
        tracing::warn!(%reason, "threshold preset and sensor part disagree");
    }
    let imu = I2cImu::open(&cfg.sensor, clock)
        .map_err(|e| EngineError::SensorFatal(format!("open IMU: {e}")))?;
    let acquisition = imu.acquisition();
    Ok(pace_if_polling(
        imu,
        acquisition,
        cfg.sensor.sample_rate_hz,
        clock,
    ))
}

#[cfg(not(feature = "hardware"))]
fn open_hardware(cfg: &Config, clock: MonotonicClock) -> eyre::Result<Box<dyn ImuSource>> {
    tracing::warn!("built without the `hardware` feature; using the idle simulated IMU");
    Ok(Box::new(SimulatedImu::new(
        Scenario::Idle,
        cfg.sensor.sample_rate_hz,
        clock,
    )))
}

fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

fn print_stats(stats: &RunStats) {
    if json_mode() {
        let obj = json!({
            "stats": {
                "ticks": stats.ticks,
                "samples": stats.samples,
                "rejected": stats.rejected,
                "idle_ticks": stats.idle_ticks,
                "transient_errors": stats.transient_errors,
                "fatal_errors": stats.fatal_errors,
                "health_failures": stats.health_failures,
                "reinits": stats.reinits,
                "events_published": stats.events_published,
                "events_dropped": stats.events_dropped,
            }
        });
        eprintln!("{obj}");
    } else {
        eprintln!("stats: {stats}");
    }
}

pub fn run(
    cfg: &Config,
    scenario: Option<Scenario>,
    duration: Option<Duration>,
    stats: bool,
    rt: RtArgs,
) -> eyre::Result<()> {
    setup_rt_once(rt);
    let clock = MonotonicClock::new();
    let detector = build_detector(cfg)?;
    let source = open_source(cfg, scenario, clock)?;
    let sink = QueuedSink::spawn(
        JsonLinesSink::new(open_output(cfg.delivery.output.as_deref())?),
        cfg.delivery.queue_capacity,
    );
    let watchdog = NotifyWatchdog::from_env();
    tracing::info!(enabled = watchdog.is_enabled(), "service watchdog");

    let shutdown = shutdown_flag()?;
    if let Some(d) = duration {
        stop_after(shutdown.clone(), d);
    }

    watchdog.notify("READY=1");
    let mut engine = Engine::new(
        source,
        detector,
        sink,
        watchdog,
        clock,
        (&cfg.sensor).into(),
        cfg.into(),
    );
    let result = engine.run_until(&shutdown);
    engine.watchdog().notify("STOPPING=1");

    // Dropping the queue joins the delivery worker after it drains.
    let sink = engine.into_sink();
    let pending = sink.pending();
    drop(sink);
    if pending > 0 {
        tracing::info!(pending, "flushed queued events on shutdown");
    }

    let run_stats = result?;
    if stats {
        print_stats(&run_stats);
    }
    Ok(())
}

pub fn replay(cfg: &Config, trace: &Path, stats: bool) -> eyre::Result<()> {
    let rows = fallwatch_config::load_trace_csv(trace)?;
    let detector = build_detector(cfg)?;
    let done = shutdown_flag()?;
    let source = ReplaySource::new(rows, Instant::now()).with_done_flag(done.clone());
    // Replay runs faster than real time; deliver inline so no event is dropped.
    let sink = JsonLinesSink::new(open_output(cfg.delivery.output.as_deref())?);

    let mut engine = Engine::new(
        source,
        detector,
        sink,
        NoopWatchdog,
        MonotonicClock::new(),
        (&cfg.sensor).into(),
        cfg.into(),
    );
    let run_stats = engine.run_until(&done)?;
    if stats {
        print_stats(&run_stats);
    }
    Ok(())
}

pub fn self_check(cfg: &Config, scenario: Option<Scenario>) -> eyre::Result<()> {
    build_detector(cfg)?;
    let mut source = open_source(cfg, scenario, MonotonicClock::new())?;
    if !source.is_healthy() {
        return Err(EngineError::SensorFatal("health probe failed".into()).into());
    }
    let timeout = Duration::from_millis(cfg.sensor.read_timeout_ms);
    let sample = match source.read(timeout) {
        Ok(Some(s)) => s,
        Ok(None) => {
            return Err(EngineError::SensorFatal(format!(
                "no sample within {} ms",
                timeout.as_millis()
            ))
            .into());
        }
        Err(e) => return Err(EngineError::SensorFatal(e.to_string()).into()),
    };

    if json_mode() {
        println!(
            "{}",
            json!({
                "self_check": "ok",
                "device_id": cfg.device.id,
                "accel_g": sample.accel_magnitude(),
                "gyro_dps": sample.gyro_magnitude(),
            })
        );
    } else {
        println!(
            "self-check OK: device={} |a|={:.3} g |w|={:.1} deg/s",
            cfg.device.id,
            sample.accel_magnitude(),
            sample.gyro_magnitude()
        );
    }
    Ok(())
}

pub fn print_config(cfg: Config) -> eyre::Result<()> {
    let resolved = Config {
        thresholds: cfg.thresholds.pinned(),
        ..cfg
    };
    let text = if json_mode() {
        serde_json::to_string_pretty(&resolved)?
    } else {
        toml::to_string_pretty(&resolved)?
    };
    println!("{text}");
    Ok(())
}
