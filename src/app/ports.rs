//! Port traits — the boundary between the sampling core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SessionContext / SamplingLoop
//! ```
//!
//! Device and network adapters implement these traits; the core consumes
//! them through generics, so every piece of run logic can be driven by
//! mocks on the host.  All port errors are typed.

use crate::error::{
    ConfigResolutionFailure, DisplayFailure, PublishFailure, SensorReadFailure,
    SessionOpenFailure,
};
use crate::sensors::sds011::ParticulateReading;

use super::progress::Rgb;

// ───────────────────────────────────────────────────────────────
// Sensor ports (hardware → core)
// ───────────────────────────────────────────────────────────────

/// The particulate sensor's serial stream.
pub trait ParticulateSensor {
    /// Block until one full frame has arrived and decode it.
    fn read_particulates(&mut self) -> Result<ParticulateReading, SensorReadFailure>;
}

/// Scalar reads from the onboard environmental sensor.  No caching: every
/// call goes to the device.
pub trait EnvironmentSensor {
    /// Pressure in hPa.
    fn pressure(&mut self) -> Result<f64, SensorReadFailure>;

    /// Relative humidity in %RH.
    fn humidity(&mut self) -> Result<f64, SensorReadFailure>;
}

// ───────────────────────────────────────────────────────────────
// Display port (core → hardware)
// ───────────────────────────────────────────────────────────────

/// An 8×8 RGB LED matrix.
pub trait LedMatrix {
    /// Turn every pixel off.
    fn clear(&mut self) -> Result<(), DisplayFailure>;

    /// Light one pixel.  `row` and `col` are 0..8.
    fn set_pixel(&mut self, row: u8, col: u8, colour: Rgb) -> Result<(), DisplayFailure>;
}

// ───────────────────────────────────────────────────────────────
// Network ports
// ───────────────────────────────────────────────────────────────

/// A persistent pub/sub connection with at-least-once delivery.
#[allow(async_fn_in_trait)]
pub trait TelemetryTransport {
    /// Establish the connection; resolves once the broker has acknowledged it.
    async fn connect(&mut self) -> Result<(), SessionOpenFailure>;

    /// Hand one message to the transport for at-least-once delivery.
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublishFailure>;

    /// Deliver everything already queued, disconnect, and wait (bounded)
    /// for the connection to wind down.  Must tolerate repeated calls.
    async fn shutdown(&mut self);

    /// Request a graceful disconnect without waiting.  Must not block and
    /// must tolerate repeated calls.
    fn disconnect(&mut self);
}

/// Remote source of the run-label document.
#[allow(async_fn_in_trait)]
pub trait RunConfigSource {
    /// Fetch the raw document body.
    async fn fetch(&self) -> Result<String, ConfigResolutionFailure>;
}
