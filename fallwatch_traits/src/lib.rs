//! Boundary types shared by the fall-detection engine and its collaborators.
//!
//! The engine never talks to a bus, a socket or a supervisor directly; it sees
//! an [`ImuSource`] for samples, an [`EventSink`] for confirmed falls and a
//! [`Watchdog`] for liveness pings.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

/// One 6-axis inertial reading.
///
/// Acceleration is in g, angular rate in deg/s, `t` is taken from the
/// monotonic clock at acquisition time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    pub t: Instant,
}

impl Sample {
    pub fn new(accel: [f32; 3], gyro: [f32; 3], t: Instant) -> Self {
        Self {
            ax: accel[0],
            ay: accel[1],
            az: accel[2],
            gx: gyro[0],
            gy: gyro[1],
            gz: gyro[2],
            t,
        }
    }

    /// Euclidean norm of the acceleration vector (g).
    #[inline]
    pub fn accel_magnitude(&self) -> f32 {
        (self.ax * self.ax + self.ay * self.ay + self.az * self.az).sqrt()
    }

    /// Euclidean norm of the angular rate vector (deg/s).
    #[inline]
    pub fn gyro_magnitude(&self) -> f32 {
        (self.gx * self.gx + self.gy * self.gy + self.gz * self.gz).sqrt()
    }

    /// `|ax| + |ay| + |az|`, used to spot a stuck or disconnected sensor.
    #[inline]
    pub fn accel_abs_sum(&self) -> f32 {
        self.ax.abs() + self.ay.abs() + self.az.abs()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// Single failed read or bus glitch; the loop resets and cools down.
    #[error("transient sensor error: {0}")]
    Transient(String),
    /// The part no longer answers as expected (identity mismatch, gone from bus).
    #[error("fatal sensor error: {0}")]
    Fatal(String),
}

/// Acquisition of inertial samples.
pub trait ImuSource {
    /// Block for at most `timeout` waiting for the next sample.
    ///
    /// `Ok(None)` means nothing arrived within the bound; housekeeping still runs.
    fn read(&mut self, timeout: Duration) -> Result<Option<Sample>, SensorError>;

    /// Lightweight identity/status probe.
    fn is_healthy(&mut self) -> bool;

    /// Bring the part back after repeated health failures. Default: nothing to do.
    fn reinit(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
}

impl<T: ImuSource + ?Sized> ImuSource for Box<T> {
    fn read(&mut self, timeout: Duration) -> Result<Option<Sample>, SensorError> {
        (**self).read(timeout)
    }
    fn is_healthy(&mut self) -> bool {
        (**self).is_healthy()
    }
    fn reinit(&mut self) -> Result<(), SensorError> {
        (**self).reinit()
    }
}

/// A confirmed fall, handed to the delivery subsystem and then forgotten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallEvent {
    pub device_id: String,
    pub timestamp: SystemTime,
    /// Posture changed and the wearer stayed motionless afterwards.
    pub severe: bool,
}

impl FallEvent {
    /// Seconds since the Unix epoch, saturating at 0 for pre-epoch clocks.
    pub fn unix_secs(&self) -> u64 {
        self.timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("event queue full")]
    QueueFull,
    #[error("event delivery channel closed")]
    Disconnected,
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Hand-off of confirmed events. Implementations must return promptly.
pub trait EventSink {
    fn publish(&mut self, event: FallEvent) -> Result<(), PublishError>;
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn publish(&mut self, event: FallEvent) -> Result<(), PublishError> {
        (**self).publish(event)
    }
}

/// Fire-and-forget liveness notification for an external supervisor.
pub trait Watchdog {
    fn ping(&mut self);
}

/// Watchdog for setups without a supervisor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWatchdog;

impl Watchdog for NoopWatchdog {
    fn ping(&mut self) {}
}
