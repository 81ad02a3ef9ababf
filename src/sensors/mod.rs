//! Sensor drivers.
//!
//! - [`sds011`] — particulate matter over serial (frame decoder).
//! - [`hts221`] / [`lps25h`] — the Sense HAT's humidity and pressure parts,
//!   combined behind [`EnvironmentSensor`] by [`SenseHatEnvironment`].

pub mod hts221;
pub mod lps25h;
pub mod sds011;

use embedded_hal::i2c::I2c;

use crate::app::ports::EnvironmentSensor;
use crate::error::SensorReadFailure;
use hts221::Hts221;
use lps25h::Lps25h;

/// The Sense HAT's onboard environmental sensors.
///
/// Each part gets its own bus handle; on Linux both are separate opens of
/// the same `/dev/i2c-N` node.
pub struct SenseHatEnvironment<H, P> {
    humidity: Hts221<H>,
    pressure: Lps25h<P>,
}

impl<H: I2c, P: I2c> SenseHatEnvironment<H, P> {
    /// Probe both parts.  Fails if either is missing or misidentified.
    pub fn new(humidity_bus: H, pressure_bus: P) -> Result<Self, SensorReadFailure> {
        Ok(Self {
            humidity: Hts221::new(humidity_bus)?,
            pressure: Lps25h::new(pressure_bus)?,
        })
    }
}

impl<H: I2c, P: I2c> EnvironmentSensor for SenseHatEnvironment<H, P> {
    fn pressure(&mut self) -> Result<f64, SensorReadFailure> {
        self.pressure.pressure()
    }

    fn humidity(&mut self) -> Result<f64, SensorReadFailure> {
        self.humidity.humidity()
    }
}
