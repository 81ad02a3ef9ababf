//! Serial link to the SDS011.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use serialport::SerialPort;

use crate::error::Error;
use crate::sensors::sds011::Sds011;

/// Per-read timeout.  Timeouts are retried by the frame reader, so this
/// bounds how long a stop request can go unnoticed during a stalled read.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

pub type SerialSds011 = Sds011<Box<dyn SerialPort>>;

/// Open the sensor's serial device (8N1, no flow control).
///
/// A stalled read is abandoned once `stop` is set.
pub fn open_sds011(path: &str, baud: u32, stop: Arc<AtomicBool>) -> Result<SerialSds011, Error> {
    let port = serialport::new(path, baud)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| Error::DeviceAbsent {
            device: "SDS011 particulate sensor",
            reason: format!("{path}: {e}"),
        })?;
    info!("SDS011: opened {} at {} baud", path, baud);
    Ok(Sds011::new(port).with_stop(stop))
}
