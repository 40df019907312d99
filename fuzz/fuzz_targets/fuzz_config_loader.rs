#![no_main]
use libfuzzer_sys::fuzz_target;

// Arbitrary TOML must either fail to parse or yield a config whose
// validation returns without panicking, including NaN and infinite floats.
fuzz_target!(|data: &str| {
    if let Ok(cfg) = steer_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
