#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core fall-detection logic (hardware-agnostic).
//!
//! All sensor interaction goes through `fallwatch_traits::ImuSource`; events
//! leave through `fallwatch_traits::EventSink`.
//!
//! ## Architecture
//!
//! - **Validation**: drop glitched or non-finite samples (`validator`)
//! - **Gravity reference**: slow EMA of acceleration while idle (`gravity`)
//! - **Detection**: Idle → FreeFall → PostImpact state machine (`machine`)
//! - **Facade**: validator + tracker + machine behind one `process` call (`detector`)
//! - **Housekeeping**: health checks, stall detection, watchdog pacing (`health`)
//! - **Delivery**: bounded non-blocking hand-off to a worker thread (`sink`)
//! - **Loop**: `Engine`, the context object driven once per tick (`runner`)
//!
//! ## Time
//!
//! Every window (free fall, stabilization, inactivity, debounce) is measured
//! on the monotonic `Instant` carried by each sample. Wall-clock time only
//! labels emitted events.

pub mod config;
pub mod conversions;
pub mod detector;
pub mod error;
pub mod gravity;
pub mod health;
pub mod machine;
pub mod mocks;
pub mod runner;
pub mod sink;
pub mod util;
pub mod validator;

pub use config::{HealthCfg, LoopCfg, Thresholds};
pub use detector::{DetectorBuilder, FallDetector, SampleStatus};
pub use error::{BuildError, EngineError, Result};
pub use gravity::{GravityEstimate, GravityTracker};
pub use health::{HealthMonitor, HealthVerdict};
pub use machine::{Detection, FallState, FallStateMachine, StateContext};
pub use runner::{Engine, RunStats};
pub use sink::QueuedSink;
pub use validator::SampleValidator;
