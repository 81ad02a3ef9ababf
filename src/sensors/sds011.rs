//! Nova SDS011 particulate-matter sensor.
//!
//! In its default active mode the sensor pushes one 10-byte frame per
//! second over a 9600-baud serial link:
//!
//! ```text
//! ┌──────┬──────┬─────────────┬─────────────┬─────────┬─────┬──────┐
//! │ 0xAA │ 0xC0 │ PM2.5 LE u16│ PM10 LE u16 │ id (2B) │ sum │ 0xAB │
//! └──────┴──────┴─────────────┴─────────────┴─────────┴─────┴──────┘
//!    0      1       2..4          4..6         6..8      8     9
//! ```
//!
//! Both concentrations are in tenths of µg/m³.  Header, id, checksum and
//! tail are not checked: the decoder trusts that the stream is aligned on
//! a frame boundary.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app::ports::ParticulateSensor;
use crate::error::SensorReadFailure;

/// Bytes per frame.
pub const FRAME_LEN: usize = 10;

/// One decoded frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticulateReading {
    pub pm25: f64,
    pub pm10: f64,
}

/// Decode a raw frame into concentrations.
pub fn decode_frame(frame: &[u8; FRAME_LEN]) -> ParticulateReading {
    let pm25 = u16::from_le_bytes([frame[2], frame[3]]);
    let pm10 = u16::from_le_bytes([frame[4], frame[5]]);
    ParticulateReading {
        pm25: f64::from(pm25) / 10.0,
        pm10: f64::from(pm10) / 10.0,
    }
}

/// Frame reader over any byte stream (a serial port in production).
pub struct Sds011<R> {
    port: R,
    stop: Option<Arc<AtomicBool>>,
}

impl<R: Read> Sds011<R> {
    pub fn new(port: R) -> Self {
        Self { port, stop: None }
    }

    /// Abandon a stalled read once `stop` is set.
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Block until exactly [`FRAME_LEN`] bytes have been read.
    ///
    /// Bytes are pulled one at a time.  A read that times out or is
    /// interrupted is retried unless the stop flag has been set, in which
    /// case the read fails with [`SensorReadFailure::Cancelled`].  Any other
    /// error, or end of stream, fails the read.
    pub fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], SensorReadFailure> {
        let mut frame = [0u8; FRAME_LEN];
        for slot in &mut frame {
            *slot = self.read_byte()?;
        }
        Ok(frame)
    }

    fn read_byte(&mut self) -> Result<u8, SensorReadFailure> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(1) => return Ok(byte[0]),
                Ok(_) => return Err(SensorReadFailure::Serial(ErrorKind::UnexpectedEof)),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    if self.stop_requested() {
                        return Err(SensorReadFailure::Cancelled);
                    }
                }
                Err(e) => return Err(SensorReadFailure::Serial(e.kind())),
            }
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn into_inner(self) -> R {
        self.port
    }
}

impl<R: Read> ParticulateSensor for Sds011<R> {
    fn read_particulates(&mut self) -> Result<ParticulateReading, SensorReadFailure> {
        let frame = self.read_frame()?;
        Ok(decode_frame(&frame))
    }
}
