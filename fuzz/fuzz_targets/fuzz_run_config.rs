//! Fuzz target: run-config document parsing.
//!
//! An accepted label is never empty and never carries an MQTT wildcard.
//!
//! cargo fuzz run fuzz_run_config

#![no_main]

use aq_telemetry::app::run_config::parse_label;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(label) = parse_label(body, "control") {
        assert!(!label.is_empty());
        assert!(!label.contains(['+', '#', '\0']));
    }
});
