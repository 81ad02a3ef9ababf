//! Fuzz target: SDS011 frame reader over an arbitrary byte stream.
//!
//! Reads frames until the stream runs dry and checks that every decoded
//! concentration is in range and that exactly `len / 10` frames come out.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use std::io::Cursor;

use aq_telemetry::app::ports::ParticulateSensor;
use aq_telemetry::sensors::sds011::{Sds011, FRAME_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut sensor = Sds011::new(Cursor::new(data));
    let mut frames = 0;
    while let Ok(reading) = sensor.read_particulates() {
        assert!((0.0..=6553.5).contains(&reading.pm25));
        assert!((0.0..=6553.5).contains(&reading.pm10));
        frames += 1;
    }
    assert_eq!(frames, data.len() / FRAME_LEN);
});
