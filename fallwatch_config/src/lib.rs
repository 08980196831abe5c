#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and recorded-trace parsing for the fall detector.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Threshold sets start from a per-hardware preset; any key present in
//!   `[thresholds]` overrides the preset value.
//! - The trace CSV loader enforces headers and monotonic timestamps so a
//!   recording can be replayed through the engine offline.
use serde::{Deserialize, Serialize};

/// Recorded trace CSV schema.
///
/// Expected headers:
/// t_ms,ax,ay,az,gx,gy,gz
///
/// Example:
/// t_ms,ax,ay,az,gx,gy,gz
/// 0,0.01,-0.02,0.99,0.4,-0.1,0.2
/// 10,0.02,-0.01,1.01,0.3,0.0,0.1
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Device {
    /// Identifier stamped on every emitted event.
    pub id: String,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            id: "unknown".to_string(),
        }
    }
}

/// Threshold presets, one per supported IMU revision.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// ICM-42605 at ±8 g / ±500 deg/s.
    #[default]
    Icm42605,
    /// Earlier ICM-42670 build at ±2 g. Each axis clips at 2 g, so impact is
    /// caught on the vector magnitude (up to ~3.5 g) and the gyro; the
    /// threshold drops to 2.5 g. Needs matching `[sensor]` identity and scale.
    Icm42670,
}

/// Fully resolved threshold set, all durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdValues {
    pub freefall_g: f32,
    pub impact_g: f32,
    pub impact_gyro_dps: f32,
    pub inactivity_gyro_dps: f32,
    pub inactivity_period_ms: u64,
    pub allowed_motion_frac: f32,
    pub posture_change_g: f32,
    pub stabilization_ms: u64,
    pub freefall_window_ms: u64,
    pub min_event_interval_ms: u64,
    pub gravity_alpha: f32,
    pub gravity_min_samples: u32,
}

impl Preset {
    pub fn values(self) -> ThresholdValues {
        let base = ThresholdValues {
            freefall_g: 0.4,
            impact_g: 3.0,
            impact_gyro_dps: 300.0,
            inactivity_gyro_dps: 20.0,
            inactivity_period_ms: 2_000,
            allowed_motion_frac: 0.2,
            posture_change_g: 0.4,
            stabilization_ms: 200,
            freefall_window_ms: 1_000,
            min_event_interval_ms: 5_000,
            gravity_alpha: 0.02,
            gravity_min_samples: 50,
        };
        match self {
            Preset::Icm42605 => base,
            Preset::Icm42670 => ThresholdValues {
                impact_g: 2.5,
                ..base
            },
        }
    }

    /// WHO_AM_I value and accel LSB/g of the part the preset was tuned on.
    pub const fn part_identity(self) -> (u8, f32) {
        match self {
            Preset::Icm42605 => (0x42, 4096.0),
            Preset::Icm42670 => (0x67, 16384.0),
        }
    }
}

/// `[thresholds]` table: a preset plus optional per-device overrides.
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdsCfg {
    pub preset: Preset,
    pub freefall_g: Option<f32>,
    pub impact_g: Option<f32>,
    pub impact_gyro_dps: Option<f32>,
    pub inactivity_gyro_dps: Option<f32>,
    pub inactivity_period_ms: Option<u64>,
    pub allowed_motion_frac: Option<f32>,
    pub posture_change_g: Option<f32>,
    pub stabilization_ms: Option<u64>,
    pub freefall_window_ms: Option<u64>,
    pub min_event_interval_ms: Option<u64>,
    pub gravity_alpha: Option<f32>,
    pub gravity_min_samples: Option<u32>,
}

impl ThresholdsCfg {
    /// Apply overrides on top of the preset.
    pub fn resolve(&self) -> ThresholdValues {
        let p = self.preset.values();
        ThresholdValues {
            freefall_g: self.freefall_g.unwrap_or(p.freefall_g),
            impact_g: self.impact_g.unwrap_or(p.impact_g),
            impact_gyro_dps: self.impact_gyro_dps.unwrap_or(p.impact_gyro_dps),
            inactivity_gyro_dps: self.inactivity_gyro_dps.unwrap_or(p.inactivity_gyro_dps),
            inactivity_period_ms: self.inactivity_period_ms.unwrap_or(p.inactivity_period_ms),
            allowed_motion_frac: self.allowed_motion_frac.unwrap_or(p.allowed_motion_frac),
            posture_change_g: self.posture_change_g.unwrap_or(p.posture_change_g),
            stabilization_ms: self.stabilization_ms.unwrap_or(p.stabilization_ms),
            freefall_window_ms: self.freefall_window_ms.unwrap_or(p.freefall_window_ms),
            min_event_interval_ms: self
                .min_event_interval_ms
                .unwrap_or(p.min_event_interval_ms),
            gravity_alpha: self.gravity_alpha.unwrap_or(p.gravity_alpha),
            gravity_min_samples: self.gravity_min_samples.unwrap_or(p.gravity_min_samples),
        }
    }

    /// Same preset with every key written out, as used by `print-config`.
    pub fn pinned(&self) -> Self {
        let v = self.resolve();
        Self {
            preset: self.preset,
            freefall_g: Some(v.freefall_g),
            impact_g: Some(v.impact_g),
            impact_gyro_dps: Some(v.impact_gyro_dps),
            inactivity_gyro_dps: Some(v.inactivity_gyro_dps),
            inactivity_period_ms: Some(v.inactivity_period_ms),
            allowed_motion_frac: Some(v.allowed_motion_frac),
            posture_change_g: Some(v.posture_change_g),
            stabilization_ms: Some(v.stabilization_ms),
            freefall_window_ms: Some(v.freefall_window_ms),
            min_event_interval_ms: Some(v.min_event_interval_ms),
            gravity_alpha: Some(v.gravity_alpha),
            gravity_min_samples: Some(v.gravity_min_samples),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// Block on the data-ready line with `read_timeout_ms`.
    #[default]
    Interrupt,
    /// Sleep one tick, then read.
    Polling,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorCfg {
    pub mode: SensorMode,
    pub sample_rate_hz: u32,
    /// Max wait for data-ready per tick (ms).
    pub read_timeout_ms: u64,
    /// Sleep after a transient bus error (ms).
    pub error_cooldown_ms: u64,
    /// Samples with |ax|+|ay|+|az| below this are treated as a dead sensor.
    pub min_valid_accel_sum: f32,
    pub i2c_bus: u8,
    pub i2c_address: u16,
    /// BCM pin wired to the IMU interrupt output.
    pub drdy_pin: u8,
    /// First register of the 12-byte accel+gyro burst (big-endian i16 x 6).
    pub data_register: u8,
    pub who_am_i_register: u8,
    pub who_am_i_expected: u8,
    /// Raw counts per g at the configured full-scale range.
    pub accel_lsb_per_g: f32,
    /// Raw counts per deg/s at the configured full-scale range.
    pub gyro_lsb_per_dps: f32,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            mode: SensorMode::Interrupt,
            sample_rate_hz: 100,
            read_timeout_ms: 500,
            error_cooldown_ms: 1_000,
            min_valid_accel_sum: 0.05,
            i2c_bus: 1,
            i2c_address: 0x69,
            drdy_pin: 16,
            data_register: 0x1F,
            who_am_i_register: 0x75,
            who_am_i_expected: 0x42,
            accel_lsb_per_g: 4096.0,
            gyro_lsb_per_dps: 65.5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCfg {
    pub check_interval_ms: u64,
    pub watchdog_interval_ms: u64,
    /// Consecutive failed checks before the source is asked to reinitialize.
    pub reinit_after_failures: u32,
    /// No valid sample for this long counts as a failed check. 0 derives it from the sensor timing.
    pub stall_ms: u64,
}

impl Default for HealthCfg {
    fn default() -> Self {
        Self {
            check_interval_ms: 10_000,
            watchdog_interval_ms: 5_000,
            reinit_after_failures: 3,
            stall_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryCfg {
    /// Capacity of the hand-off queue between detector and delivery worker.
    pub queue_capacity: usize,
    /// JSON-lines output path; stdout when absent.
    pub output: Option<String>,
}

impl Default for DeliveryCfg {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            output: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub thresholds: ThresholdsCfg,
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub health: HealthCfg,
    #[serde(default)]
    pub delivery: DeliveryCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file, then validate it.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
    read_trace(rdr).map_err(|e| e.wrap_err(format!("trace CSV {path:?}")))
}

/// Parse trace rows from any reader (headers required).
pub fn parse_trace<R: std::io::Read>(input: R) -> eyre::Result<Vec<TraceRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    read_trace(rdr)
}

fn read_trace<R: std::io::Read>(mut rdr: csv::Reader<R>) -> eyre::Result<Vec<TraceRow>> {
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers: {}", e))?
        .clone();
    let expected = ["t_ms", "ax", "ay", "az", "gx", "gy", "gz"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers '{}', got: {}",
            expected.join(","),
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!(
                "trace timestamps must be non-decreasing (row {}: {} < {})",
                idx + 2,
                row.t_ms,
                prev.t_ms
            );
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("trace contains no samples");
    }
    Ok(rows)
}

impl Config {
    /// `Some(reason)` when `[sensor]` identity or scale belongs to a different
    /// part than the threshold preset.
    pub fn preset_sensor_mismatch(&self) -> Option<String> {
        let (who_am_i, lsb_per_g) = self.thresholds.preset.part_identity();
        let sensor = &self.sensor;
        if sensor.who_am_i_expected == who_am_i && (sensor.accel_lsb_per_g - lsb_per_g).abs() < 0.5 {
            return None;
        }
        Some(format!(
            "preset {:?} expects who_am_i_expected = {who_am_i:#04x} and accel_lsb_per_g = {lsb_per_g}, \
             [sensor] has {:#04x} and {}",
            self.thresholds.preset, sensor.who_am_i_expected, sensor.accel_lsb_per_g
        ))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Device
        if self.device.id.trim().is_empty() {
            eyre::bail!("device.id must not be empty");
        }

        // Thresholds
        let t = self.thresholds.resolve();
        let positive = [
            ("thresholds.freefall_g", t.freefall_g),
            ("thresholds.impact_g", t.impact_g),
            ("thresholds.impact_gyro_dps", t.impact_gyro_dps),
            ("thresholds.inactivity_gyro_dps", t.inactivity_gyro_dps),
            ("thresholds.posture_change_g", t.posture_change_g),
        ];
        for (key, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                eyre::bail!("{key} must be > 0");
            }
        }
        if t.impact_g <= t.freefall_g {
            eyre::bail!("thresholds.impact_g must be greater than thresholds.freefall_g");
        }
        if !(0.0..=1.0).contains(&t.allowed_motion_frac) {
            eyre::bail!("thresholds.allowed_motion_frac must be in [0.0, 1.0]");
        }
        if !(t.gravity_alpha > 0.0 && t.gravity_alpha <= 1.0) {
            eyre::bail!("thresholds.gravity_alpha must be in (0.0, 1.0]");
        }
        if t.inactivity_period_ms == 0 {
            eyre::bail!("thresholds.inactivity_period_ms must be >= 1");
        }
        if t.freefall_window_ms == 0 {
            eyre::bail!("thresholds.freefall_window_ms must be >= 1");
        }
        if t.inactivity_period_ms > 60 * 1000 {
            eyre::bail!("thresholds.inactivity_period_ms is unreasonably large (>1min)");
        }

        // Sensor
        if self.sensor.sample_rate_hz == 0 {
            eyre::bail!("sensor.sample_rate_hz must be > 0");
        }
        if self.sensor.sample_rate_hz > 8_000 {
            eyre::bail!("sensor.sample_rate_hz must be <= 8000");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        if !(self.sensor.min_valid_accel_sum.is_finite() && self.sensor.min_valid_accel_sum >= 0.0)
        {
            eyre::bail!("sensor.min_valid_accel_sum must be >= 0.0");
        }
        if self.sensor.i2c_address > 0x7F {
            eyre::bail!("sensor.i2c_address must be a 7-bit address");
        }
        if !(self.sensor.accel_lsb_per_g.is_finite() && self.sensor.accel_lsb_per_g > 0.0) {
            eyre::bail!("sensor.accel_lsb_per_g must be > 0");
        }
        if !(self.sensor.gyro_lsb_per_dps.is_finite() && self.sensor.gyro_lsb_per_dps > 0.0) {
            eyre::bail!("sensor.gyro_lsb_per_dps must be > 0");
        }

        // Health
        if self.health.check_interval_ms == 0 {
            eyre::bail!("health.check_interval_ms must be >= 1");
        }
        if self.health.watchdog_interval_ms == 0 {
            eyre::bail!("health.watchdog_interval_ms must be >= 1");
        }
        if self.health.reinit_after_failures == 0 {
            eyre::bail!("health.reinit_after_failures must be >= 1");
        }

        // Delivery
        if self.delivery.queue_capacity == 0 {
            eyre::bail!("delivery.queue_capacity must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_production_defaults() {
        let cfg = load_toml("").expect("empty TOML parses");
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.thresholds.resolve(), Preset::Icm42605.values());
        assert_eq!(cfg.sensor.sample_rate_hz, 100);
        assert_eq!(cfg.device.id, "unknown");
    }

    #[test]
    fn presets_differ_only_in_impact() {
        let a = Preset::Icm42605.values();
        let b = Preset::Icm42670.values();
        assert_eq!(b.impact_g, 2.5);
        assert_eq!(ThresholdValues { impact_g: a.impact_g, ..b }, a);
    }

    #[test]
    fn pinned_config_reloads_to_same_thresholds() {
        let cfg = load_toml("[thresholds]\npreset = \"icm42670\"\nfreefall_g = 0.35").unwrap();
        let pinned = Config {
            thresholds: cfg.thresholds.pinned(),
            ..cfg
        };
        let text = toml::to_string_pretty(&pinned).unwrap();
        assert!(text.contains("impact_g = 2.5"));
        let back = load_toml(&text).unwrap();
        back.validate().unwrap();
        assert_eq!(back.thresholds.resolve(), pinned.thresholds.resolve());
        assert_eq!(back.thresholds.resolve().freefall_g, 0.35);
    }
}
