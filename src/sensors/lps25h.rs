//! ST LPS25H barometric pressure sensor (Sense HAT, I2C address 0x5C).
//!
//! Runs in continuous 1 Hz mode.  Pressure output is a 24-bit two's
//! complement value in units of 1/4096 hPa.

use embedded_hal::i2c::I2c;

use crate::error::SensorReadFailure;

pub const ADDRESS: u8 = 0x5C;

const DEVICE: &str = "LPS25H";
const WHO_AM_I: u8 = 0x0F;
const WHO_AM_I_VALUE: u8 = 0xBD;
const CTRL_REG1: u8 = 0x20;
/// PD=1, ODR=1 Hz.
const CTRL_REG1_ACTIVE: u8 = 0x90;
const PRESS_OUT_XL: u8 = 0x28;
const AUTO_INCREMENT: u8 = 0x80;
const COUNTS_PER_HPA: f64 = 4096.0;

/// Convert the three output registers (XL, L, H) into hPa.
pub fn raw_to_hpa(out: [u8; 3]) -> f64 {
    // Sign-extend by placing the 24-bit value in the top of an i32.
    let raw = i32::from_le_bytes([0, out[0], out[1], out[2]]) >> 8;
    f64::from(raw) / COUNTS_PER_HPA
}

pub struct Lps25h<I> {
    i2c: I,
}

impl<I: I2c> Lps25h<I> {
    /// Verify the device id and power it up.
    pub fn new(mut i2c: I) -> Result<Self, SensorReadFailure> {
        let mut id = [0u8];
        i2c.write_read(ADDRESS, &[WHO_AM_I], &mut id).map_err(bus)?;
        if id[0] != WHO_AM_I_VALUE {
            return Err(SensorReadFailure::UnexpectedId {
                device: DEVICE,
                found: id[0],
            });
        }
        i2c.write(ADDRESS, &[CTRL_REG1, CTRL_REG1_ACTIVE]).map_err(bus)?;
        Ok(Self { i2c })
    }

    /// Latest pressure in hPa.
    pub fn pressure(&mut self) -> Result<f64, SensorReadFailure> {
        let mut out = [0u8; 3];
        self.i2c
            .write_read(ADDRESS, &[PRESS_OUT_XL | AUTO_INCREMENT], &mut out)
            .map_err(bus)?;
        Ok(raw_to_hpa(out))
    }
}

fn bus<E: embedded_hal::i2c::Error>(e: E) -> SensorReadFailure {
    SensorReadFailure::Bus {
        device: DEVICE,
        kind: e.kind(),
    }
}
