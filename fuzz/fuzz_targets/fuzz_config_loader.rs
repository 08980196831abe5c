#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse or validate without panicking,
    // including threshold resolution against the selected preset.
    if let Ok(cfg) = fallwatch_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let _ = cfg.thresholds.resolve();
        }
    }
});
