#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are fine; panics are not.
    let Ok(cfg) = toml::from_str::<flow_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // Anything that validates must also build a state machine per channel.
    for ch in &cfg.channels {
        let meter = flow_core::MeterCfg::from(&ch.effective(&cfg.meter));
        assert!(
            flow_core::PourState::new(meter).is_ok(),
            "validated config rejected by core: {meter:?}"
        );
    }
});
