//! Three-phase fall state machine.
//!
//! Idle → FreeFall on a drop in |accel|, FreeFall → PostImpact on an accel or
//! gyro spike inside the free-fall window, then PostImpact collects a window
//! of stillness flags and accelerations and decides:
//!
//! | posture changed | motionless | outcome                 |
//! |-----------------|------------|-------------------------|
//! | yes             | yes        | `Detection{severe}`     |
//! | yes             | no         | `Detection{!severe}`    |
//! | no              | -          | none (recovered)        |
//!
//! Every evaluated episode arms the debounce; an expired free fall does not.

use std::collections::VecDeque;
use std::time::Instant;

use fallwatch_traits::Sample;

use crate::config::Thresholds;
use crate::gravity::{GravityEstimate, GravityTracker};
use crate::util::ticks_in;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallState {
    Idle,
    FreeFall,
    PostImpact,
}

impl FallState {
    pub fn as_str(self) -> &'static str {
        match self {
            FallState::Idle => "idle",
            FallState::FreeFall => "free_fall",
            FallState::PostImpact => "post_impact",
        }
    }
}

/// Confirmed fall as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub severe: bool,
    pub at: Instant,
    /// Distance between averaged post-impact accel and the pre-event gravity, if trusted.
    pub posture_delta_g: Option<f32>,
    /// Fraction of post-impact ticks above the inactivity gyro threshold.
    pub movement_frac: f32,
}

/// Running sum of post-impact acceleration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PostureAccumulator {
    sum: [f64; 3],
    n: u32,
}

impl PostureAccumulator {
    fn add(&mut self, s: &Sample) {
        self.sum[0] += f64::from(s.ax);
        self.sum[1] += f64::from(s.ay);
        self.sum[2] += f64::from(s.az);
        self.n = self.n.saturating_add(1);
    }

    pub fn count(&self) -> u32 {
        self.n
    }

    pub fn mean(&self) -> Option<[f32; 3]> {
        if self.n == 0 {
            return None;
        }
        let n = f64::from(self.n);
        Some([
            (self.sum[0] / n) as f32,
            (self.sum[1] / n) as f32,
            (self.sum[2] / n) as f32,
        ])
    }
}

/// Per-episode detector state. Only `last_event_at` survives a reset.
#[derive(Debug, Clone)]
pub struct StateContext {
    state: FallState,
    free_fall_started_at: Option<Instant>,
    impact_at: Option<Instant>,
    inactivity_started_at: Option<Instant>,
    inactivity_samples: VecDeque<bool>,
    inactivity_capacity: usize,
    pre_event_gravity: Option<GravityEstimate>,
    posture: PostureAccumulator,
    last_event_at: Option<Instant>,
}

impl StateContext {
    fn new(inactivity_capacity: usize) -> Self {
        Self {
            state: FallState::Idle,
            free_fall_started_at: None,
            impact_at: None,
            inactivity_started_at: None,
            inactivity_samples: VecDeque::with_capacity(inactivity_capacity),
            inactivity_capacity,
            pre_event_gravity: None,
            posture: PostureAccumulator::default(),
            last_event_at: None,
        }
    }

    fn reset(&mut self) {
        self.state = FallState::Idle;
        self.free_fall_started_at = None;
        self.impact_at = None;
        self.inactivity_started_at = None;
        self.inactivity_samples.clear();
        self.pre_event_gravity = None;
        self.posture = PostureAccumulator::default();
    }

    fn push_motion_flag(&mut self, moving: bool) {
        if self.inactivity_samples.len() == self.inactivity_capacity {
            self.inactivity_samples.pop_front();
        }
        self.inactivity_samples.push_back(moving);
    }

    fn movement_frac(&self) -> f32 {
        let n = self.inactivity_samples.len().max(1);
        let moving = self.inactivity_samples.iter().filter(|m| **m).count();
        moving as f32 / n as f32
    }

    fn mark_event(&mut self, now: Instant) {
        self.last_event_at = Some(match self.last_event_at {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }

    pub fn state(&self) -> FallState {
        self.state
    }
    pub fn free_fall_started_at(&self) -> Option<Instant> {
        self.free_fall_started_at
    }
    pub fn impact_at(&self) -> Option<Instant> {
        self.impact_at
    }
    pub fn inactivity_started_at(&self) -> Option<Instant> {
        self.inactivity_started_at
    }
    pub fn inactivity_len(&self) -> usize {
        self.inactivity_samples.len()
    }
    pub fn inactivity_capacity(&self) -> usize {
        self.inactivity_capacity
    }
    pub fn pre_event_gravity(&self) -> Option<&GravityEstimate> {
        self.pre_event_gravity.as_ref()
    }
    pub fn posture(&self) -> &PostureAccumulator {
        &self.posture
    }
    pub fn last_event_at(&self) -> Option<Instant> {
        self.last_event_at
    }
}

#[derive(Debug, Clone)]
pub struct FallStateMachine {
    thresholds: Thresholds,
    ctx: StateContext,
}

impl FallStateMachine {
    pub fn new(thresholds: Thresholds, sample_rate_hz: u32) -> Self {
        let capacity = ticks_in(thresholds.inactivity_period, sample_rate_hz);
        Self {
            thresholds,
            ctx: StateContext::new(capacity),
        }
    }

    pub fn state(&self) -> FallState {
        self.ctx.state
    }

    pub fn context(&self) -> &StateContext {
        &self.ctx
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Abandon any episode in progress; debounce memory is kept.
    pub fn reset(&mut self) {
        if self.ctx.state != FallState::Idle {
            tracing::debug!(state = self.ctx.state.as_str(), "detector reset");
        }
        self.ctx.reset();
    }

    /// Advance on one validated sample. `gravity` is the live tracker; only a
    /// snapshot of it is kept.
    pub fn process(&mut self, sample: &Sample, gravity: &GravityTracker) -> Option<Detection> {
        let now = sample.t;
        let accel = sample.accel_magnitude();
        let gyro = sample.gyro_magnitude();
        tracing::trace!(
            accel_g = accel,
            gyro_dps = gyro,
            state = self.ctx.state.as_str(),
            "sample"
        );

        match self.ctx.state {
            FallState::Idle => {
                if accel < self.thresholds.freefall_g && self.debounce_elapsed(now) {
                    self.enter_free_fall(now, gravity, accel);
                }
                None
            }
            FallState::FreeFall => {
                self.on_free_fall(now, accel, gyro);
                None
            }
            FallState::PostImpact => self.on_post_impact(sample, gyro),
        }
    }

    fn debounce_elapsed(&self, now: Instant) -> bool {
        match self.ctx.last_event_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.thresholds.min_event_interval,
        }
    }

    fn enter_free_fall(&mut self, now: Instant, gravity: &GravityTracker, accel: f32) {
        let snap = gravity.snapshot();
        self.ctx.state = FallState::FreeFall;
        self.ctx.free_fall_started_at = Some(now);
        self.ctx.pre_event_gravity = (snap.sample_count > 0).then_some(snap);
        tracing::info!(accel_g = accel, "free fall detected");
    }

    fn on_free_fall(&mut self, now: Instant, accel: f32, gyro: f32) {
        let Some(started) = self.ctx.free_fall_started_at else {
            self.ctx.reset();
            return;
        };
        if now.saturating_duration_since(started) > self.thresholds.freefall_window {
            tracing::info!("free fall expired without impact");
            self.ctx.reset();
            return;
        }
        if accel > self.thresholds.impact_g || gyro > self.thresholds.impact_gyro_dps {
            self.ctx.state = FallState::PostImpact;
            self.ctx.impact_at = Some(now);
            self.ctx.inactivity_started_at = Some(now + self.thresholds.stabilization);
            self.ctx.inactivity_samples.clear();
            self.ctx.posture = PostureAccumulator::default();
            tracing::info!(
                accel_g = accel,
                gyro_dps = gyro,
                stabilization_ms = self.thresholds.stabilization.as_millis() as u64,
                "impact detected"
            );
        }
    }

    fn on_post_impact(&mut self, sample: &Sample, gyro: f32) -> Option<Detection> {
        let now = sample.t;
        let Some(start) = self.ctx.inactivity_started_at else {
            self.ctx.reset();
            return None;
        };
        if now < start {
            return None;
        }

        self.ctx
            .push_motion_flag(gyro > self.thresholds.inactivity_gyro_dps);
        self.ctx.posture.add(sample);

        if now.saturating_duration_since(start) < self.thresholds.inactivity_period {
            return None;
        }

        let detection = self.evaluate(now);
        self.ctx.mark_event(now);
        self.ctx.reset();
        detection
    }

    fn evaluate(&self, now: Instant) -> Option<Detection> {
        let movement_frac = self.ctx.movement_frac();
        let motionless = movement_frac <= self.thresholds.allowed_motion_frac;
        let mean = self.ctx.posture.mean()?;

        let posture_delta_g = match self.ctx.pre_event_gravity {
            Some(g) if g.sample_count >= self.thresholds.gravity_min_samples => {
                Some(g.distance_to(mean))
            }
            _ => None,
        };
        let posture_changed = match posture_delta_g {
            Some(delta) => {
                tracing::info!(
                    delta_g = delta,
                    threshold_g = self.thresholds.posture_change_g,
                    "posture delta"
                );
                delta >= self.thresholds.posture_change_g
            }
            None => {
                // Reference not trustworthy yet: report rather than suppress.
                tracing::info!("posture check skipped, gravity reference not warmed up");
                true
            }
        };

        if !posture_changed {
            tracing::info!(movement_frac, "false alarm, posture unchanged");
            return None;
        }

        let severe = motionless;
        tracing::info!(severe, movement_frac, "fall confirmed");
        Some(Detection {
            severe,
            at: now,
            posture_delta_g,
            movement_frac,
        })
    }
}
