//! Board drivers for the Raspberry Pi Sense HAT.

pub mod led_matrix;
#[cfg(all(feature = "device", target_os = "linux"))]
pub mod sense_hat;
