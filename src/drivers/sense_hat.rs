//! Sense HAT environmental sensors on a Linux I2C bus.

use linux_embedded_hal::I2cdev;
use log::info;

use crate::error::Error;
use crate::sensors::SenseHatEnvironment;

pub type LinuxSenseHatEnvironment = SenseHatEnvironment<I2cdev, I2cdev>;

/// Open `bus` twice (one handle per part) and probe both sensors.
pub fn open_environment(bus: &str) -> Result<LinuxSenseHatEnvironment, Error> {
    let open = |part: &'static str| {
        I2cdev::new(bus).map_err(|e| Error::DeviceAbsent {
            device: part,
            reason: format!("{bus}: {e}"),
        })
    };
    let humidity_bus = open("HTS221 humidity sensor")?;
    let pressure_bus = open("LPS25H pressure sensor")?;

    let env = SenseHatEnvironment::new(humidity_bus, pressure_bus).map_err(|e| {
        Error::DeviceAbsent {
            device: "Sense HAT environmental sensors",
            reason: e.to_string(),
        }
    })?;
    info!("Sense HAT: environmental sensors ready on {}", bus);
    Ok(env)
}
