use fallwatch_config::{Preset, SensorMode, load_toml};
use rstest::rstest;

#[test]
fn full_config_parses_and_validates() {
    let toml = r#"
[device]
id = "cam-0042"

[thresholds]
preset = "icm42670"
posture_change_g = 0.5

[sensor]
mode = "polling"
sample_rate_hz = 50
read_timeout_ms = 250
error_cooldown_ms = 500

[health]
check_interval_ms = 2000
watchdog_interval_ms = 1000
reinit_after_failures = 2

[delivery]
queue_capacity = 4
output = "/tmp/falls.jsonl"

[logging]
level = "debug"
rotation = "daily"
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");

    assert_eq!(cfg.device.id, "cam-0042");
    assert_eq!(cfg.thresholds.preset, Preset::Icm42670);
    assert_eq!(cfg.sensor.mode, SensorMode::Polling);

    let t = cfg.thresholds.resolve();
    // override wins, preset fills the rest
    assert_eq!(t.posture_change_g, 0.5);
    assert_eq!(t.impact_g, 2.5);
    assert_eq!(t.freefall_g, 0.4);
}

#[rstest]
#[case("[sensor]\nsample_rate_hz = 0", "sensor.sample_rate_hz must be > 0")]
#[case("[sensor]\nread_timeout_ms = 0", "sensor.read_timeout_ms must be >= 1")]
#[case("[thresholds]\nimpact_g = 0.3", "impact_g must be greater than")]
#[case("[thresholds]\nallowed_motion_frac = 1.5", "allowed_motion_frac must be in")]
#[case("[thresholds]\ngravity_alpha = 0.0", "gravity_alpha must be in")]
#[case("[thresholds]\nfreefall_window_ms = 0", "freefall_window_ms must be >= 1")]
#[case("[thresholds]\nposture_change_g = -1.0", "posture_change_g must be > 0")]
#[case("[health]\nreinit_after_failures = 0", "reinit_after_failures must be >= 1")]
#[case("[delivery]\nqueue_capacity = 0", "queue_capacity must be >= 1")]
#[case("[device]\nid = \"  \"", "device.id must not be empty")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
#[case("[sensor]\naccel_lsb_per_g = 0.0", "sensor.accel_lsb_per_g must be > 0")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] expected: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(expected),
        "expected '{expected}', got '{err}'"
    );
}

#[test]
fn unknown_threshold_key_is_a_parse_error() {
    let err = load_toml("[thresholds]\nfree_fall = 0.3").expect_err("typo must not be ignored");
    assert!(format!("{err}").contains("unknown field"));
}

#[test]
fn unknown_preset_is_a_parse_error() {
    assert!(load_toml("[thresholds]\npreset = \"mpu6050\"").is_err());
}

#[test]
fn load_file_reports_path_on_missing_file() {
    let err = fallwatch_config::load_file(std::path::Path::new("/nonexistent/fallwatch.toml"))
        .expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}

#[rstest]
#[case("", None)]
#[case("[thresholds]\npreset = \"icm42670\"\n", Some("0x67"))]
#[case(
    "[thresholds]\npreset = \"icm42670\"\n[sensor]\nwho_am_i_expected = 0x67\naccel_lsb_per_g = 16384.0\n",
    None
)]
#[case("[sensor]\naccel_lsb_per_g = 16384.0\n", Some("4096"))]
fn preset_must_match_sensor_part(#[case] body: &str, #[case] needle: Option<&str>) {
    let cfg = load_toml(body).unwrap();
    let mismatch = cfg.preset_sensor_mismatch();
    match needle {
        None => assert!(mismatch.is_none(), "{mismatch:?}"),
        Some(n) => assert!(mismatch.is_some_and(|m| m.contains(n))),
    }
}
