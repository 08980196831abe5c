//! Detector facade and its builder.
//!
//! Wires validator → gravity tracker (idle only) → state machine, and turns a
//! `Detection` into a `FallEvent` stamped with the device id.

use std::sync::Arc;

use fallwatch_traits::clock::{Clock, MonotonicClock};
use fallwatch_traits::{FallEvent, Sample};

use crate::config::Thresholds;
use crate::error::BuildError;
use crate::gravity::GravityTracker;
use crate::machine::{FallState, FallStateMachine};
use crate::validator::{DEFAULT_MIN_ACCEL_SUM, SampleValidator};

/// Result of feeding one sample to the detector.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleStatus {
    /// Dropped by the validator; detector state untouched.
    Rejected,
    /// Consumed; no event this tick.
    Accepted,
    /// Consumed and an episode ended in a confirmed fall.
    Fall(FallEvent),
}

impl SampleStatus {
    pub fn into_event(self) -> Option<FallEvent> {
        match self {
            SampleStatus::Fall(ev) => Some(ev),
            _ => None,
        }
    }
}

pub struct FallDetector {
    device_id: String,
    validator: SampleValidator,
    gravity: GravityTracker,
    machine: FallStateMachine,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for FallDetector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FallDetector")
            .field("device_id", &self.device_id)
            .field("state", &self.machine.state())
            .field("gravity", self.gravity.estimate())
            .field("rejected", &self.validator.rejected())
            .finish()
    }
}

impl FallDetector {
    pub fn builder() -> DetectorBuilder {
        DetectorBuilder::default()
    }

    /// Run one sample through the pipeline.
    pub fn process(&mut self, sample: &Sample) -> SampleStatus {
        if !self.validator.accept(sample) {
            return SampleStatus::Rejected;
        }
        if self.machine.state() == FallState::Idle {
            self.gravity.update(sample);
        }
        match self.machine.process(sample, &self.gravity) {
            Some(d) => SampleStatus::Fall(FallEvent {
                device_id: self.device_id.clone(),
                timestamp: self.clock.wall(),
                severe: d.severe,
            }),
            None => SampleStatus::Accepted,
        }
    }

    /// Drop any in-progress episode (after a sensor error).
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    pub fn state(&self) -> FallState {
        self.machine.state()
    }

    pub fn machine(&self) -> &FallStateMachine {
        &self.machine
    }

    pub fn gravity(&self) -> &GravityTracker {
        &self.gravity
    }

    pub fn rejected_samples(&self) -> u64 {
        self.validator.rejected()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

#[derive(Default)]
pub struct DetectorBuilder {
    device_id: Option<String>,
    thresholds: Option<Thresholds>,
    sample_rate_hz: Option<u32>,
    min_valid_accel_sum: Option<f32>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl DetectorBuilder {
    pub fn with_device_id(mut self, id: impl Into<String>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    pub fn with_sample_rate_hz(mut self, hz: u32) -> Self {
        self.sample_rate_hz = Some(hz);
        self
    }

    pub fn with_min_valid_accel_sum(mut self, g: f32) -> Self {
        self.min_valid_accel_sum = Some(g);
        self
    }

    /// Clock used to stamp events with wall time.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> Result<FallDetector, BuildError> {
        let device_id = self
            .device_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(BuildError::MissingDeviceId)?;
        let thresholds = self.thresholds.unwrap_or_default();
        thresholds.validate()?;
        let hz = self.sample_rate_hz.unwrap_or(100);
        if hz == 0 {
            return Err(BuildError::InvalidConfig("sample_rate_hz must be > 0"));
        }
        let min_sum = self.min_valid_accel_sum.unwrap_or(DEFAULT_MIN_ACCEL_SUM);
        if !(min_sum.is_finite() && min_sum >= 0.0) {
            return Err(BuildError::InvalidConfig("min_valid_accel_sum must be >= 0"));
        }

        tracing::info!(
            device_id = %device_id,
            freefall_g = thresholds.freefall_g,
            impact_g = thresholds.impact_g,
            impact_gyro_dps = thresholds.impact_gyro_dps,
            inactivity_ms = thresholds.inactivity_period.as_millis() as u64,
            posture_g = thresholds.posture_change_g,
            "fall detector configured"
        );

        Ok(FallDetector {
            device_id,
            validator: SampleValidator::new(min_sum),
            gravity: GravityTracker::new(thresholds.gravity_alpha, thresholds.gravity_min_samples),
            machine: FallStateMachine::new(thresholds, hz),
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(MonotonicClock::new())),
        })
    }
}
