//! Human-readable error descriptions, exit codes and structured JSON error formatting.

use fallwatch_core::{BuildError, EngineError};

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_SENSOR_FATAL: i32 = 3;
pub const EXIT_CONFIG: i32 = 4;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDeviceId => {
                "What happened: No device id was configured.\nLikely causes: [device] id is empty in the config.\nHow to fix: Set [device] id to the identifier the caregiver system expects.".to_string()
            }
            BuildError::InvalidThresholds(msg) => format!(
                "What happened: Detection thresholds are inconsistent ({msg}).\nLikely causes: An override in [thresholds] conflicts with the preset.\nHow to fix: Run `fallwatch print-config` to see the effective values, then correct the override."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ee) = err.downcast_ref::<EngineError>() {
        return match ee {
            EngineError::SensorFatal(msg) => format!(
                "What happened: The IMU could not be brought up ({msg}).\nLikely causes: Wrong I2C bus/address, a different part than configured (who_am_i), loose wiring or no power.\nHow to fix: Check [sensor] i2c_bus, i2c_address and who_am_i_expected, verify wiring, then restart."
            ),
            EngineError::Config(msg) => format!(
                "What happened: Configuration could not be loaded.\nDetails: {msg}\nHow to fix: Fix the named key in the TOML (see etc/fallwatch.toml for a sample) and rerun."
            ),
        };
    }

    // String-based heuristics for errors coming from source setup or input files
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "What happened: The trace file has the wrong header.\nLikely causes: The CSV was not recorded by fallwatch or was edited.\nHow to fix: The first line must be exactly 't_ms,ax,ay,az,gx,gy,gz'.".to_string();
    }

    if lower.contains("open trace csv") {
        return format!(
            "What happened: The trace file could not be opened.\nHow to fix: Check the path and permissions. Original: {msg}"
        );
    }

    if lower.contains("open event output") {
        return format!(
            "What happened: The event output file could not be opened.\nHow to fix: Check [delivery] output and directory permissions. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 sensor fatal, 4 configuration invalid, 1 anything else.
/// Usage errors exit with 2 from clap before any of this runs.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ee) = err.downcast_ref::<EngineError>() {
        return match ee {
            EngineError::SensorFatal(_) => EXIT_SENSOR_FATAL,
            EngineError::Config(_) => EXIT_CONFIG,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    EXIT_GENERIC
}

/// Stable machine-readable name of the error class.
fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::SensorFatal(_)) => "SensorFatal",
        Some(EngineError::Config(_)) => "Config",
        None if err.downcast_ref::<BuildError>().is_some() => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(eyre::Report::new(EngineError::SensorFatal("who_am_i 0x00".into())), 3, "SensorFatal")]
    #[case(eyre::Report::new(EngineError::Config("sensor.sample_rate_hz must be > 0".into())), 4, "Config")]
    #[case(eyre::Report::new(BuildError::MissingDeviceId), 4, "Config")]
    #[case(eyre::eyre!("disk on fire"), 1, "Error")]
    fn exit_codes_and_reasons(#[case] err: eyre::Report, #[case] code: i32, #[case] reason: &str) {
        assert_eq!(exit_code_for_error(&err), code);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], reason);
        assert_eq!(v["exit_code"], code);
    }

    #[test]
    fn wrapped_engine_error_keeps_its_code() {
        let err = eyre::Report::new(EngineError::SensorFatal("gone".into())).wrap_err("engine stopped");
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("IMU could not be brought up"));
    }

    #[test]
    fn bad_trace_header_gets_specific_hint() {
        let err = eyre::eyre!("trace CSV must have headers 't_ms,ax,ay,az,gx,gy,gz', got: t,x");
        assert!(humanize(&err).contains("exactly 't_ms,ax,ay,az,gx,gy,gz'"));
    }
}
