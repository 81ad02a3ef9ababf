//! ST HTS221 relative-humidity sensor (Sense HAT, I2C address 0x5F).
//!
//! The part is put in continuous 1 Hz mode with block data update, so a
//! read always returns the most recent complete conversion.  Raw output is
//! converted with the per-device two-point calibration burned in at the
//! factory (registers 0x30..0x3F).

use embedded_hal::i2c::I2c;

use crate::error::SensorReadFailure;

pub const ADDRESS: u8 = 0x5F;

const DEVICE: &str = "HTS221";
const WHO_AM_I: u8 = 0x0F;
const WHO_AM_I_VALUE: u8 = 0xBC;
const CTRL_REG1: u8 = 0x20;
/// PD=1, BDU=1, ODR=1 Hz.
const CTRL_REG1_ACTIVE: u8 = 0x85;
const HUMIDITY_OUT_L: u8 = 0x28;
const CALIB_START: u8 = 0x30;
/// Register auto-increment flag for multi-byte reads.
const AUTO_INCREMENT: u8 = 0x80;

/// Humidity calibration line: two (raw, %RH) points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub h0_rh: f64,
    pub h1_rh: f64,
    pub h0_out: i16,
    pub h1_out: i16,
}

impl Calibration {
    /// Parse the 16 calibration registers starting at 0x30.
    pub fn from_registers(regs: &[u8; 16]) -> Self {
        Self {
            h0_rh: f64::from(regs[0]) / 2.0,
            h1_rh: f64::from(regs[1]) / 2.0,
            h0_out: i16::from_le_bytes([regs[6], regs[7]]),
            h1_out: i16::from_le_bytes([regs[10], regs[11]]),
        }
    }

    /// Convert a raw output sample into %RH, clamped to 0..=100.
    pub fn humidity(&self, raw: i16) -> f64 {
        let span = f64::from(self.h1_out) - f64::from(self.h0_out);
        if span == 0.0 {
            return self.h0_rh;
        }
        let rh = self.h0_rh + (self.h1_rh - self.h0_rh) * (f64::from(raw) - f64::from(self.h0_out)) / span;
        rh.clamp(0.0, 100.0)
    }
}

pub struct Hts221<I> {
    i2c: I,
    calibration: Calibration,
}

impl<I: I2c> Hts221<I> {
    /// Verify the device id, power it up and load its calibration.
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

        let mut regs = [0u8; 16];
        i2c.write_read(ADDRESS, &[CALIB_START | AUTO_INCREMENT], &mut regs)
            .map_err(bus)?;

        Ok(Self {
            i2c,
            calibration: Calibration::from_registers(&regs),
        })
    }

    /// Latest relative humidity in %RH.
    pub fn humidity(&mut self) -> Result<f64, SensorReadFailure> {
        let mut out = [0u8; 2];
        self.i2c
            .write_read(ADDRESS, &[HUMIDITY_OUT_L | AUTO_INCREMENT], &mut out)
            .map_err(bus)?;
        Ok(self.calibration.humidity(i16::from_le_bytes(out)))
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }
}

fn bus<E: embedded_hal::i2c::Error>(e: E) -> SensorReadFailure {
    SensorReadFailure::Bus {
        device: DEVICE,
        kind: e.kind(),
    }
}
