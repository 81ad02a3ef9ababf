//! Unified error types for the telemetry agent.
//!
//! Every subsystem has its own small error enum; they all convert into
//! [`Error`] so the session bootstrap and the sampling loop handle failure
//! uniformly.  Whether a failure is fatal is decided by the caller, not by
//! the type: a [`PublishFailure`] is logged and dropped, a
//! [`SensorReadFailure`] ends the run.

use core::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fatal condition funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// A sensor could not be read mid-run, or failed its presence check.
    Sensor(SensorReadFailure),
    /// The telemetry session could not be established.
    Session(SessionOpenFailure),
    /// The LED matrix could not be driven.
    Display(DisplayFailure),
    /// A required device is missing at startup.
    DeviceAbsent {
        device: &'static str,
        reason: String,
    },
    /// The agent configuration is unusable.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Session(e) => write!(f, "session: {e}"),
            Self::Display(e) => write!(f, "display: {e}"),
            Self::DeviceAbsent { device, reason } => write!(f, "{device} absent: {reason}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<SensorReadFailure> for Error {
    fn from(e: SensorReadFailure) -> Self {
        Self::Sensor(e)
    }
}

impl From<SessionOpenFailure> for Error {
    fn from(e: SessionOpenFailure) -> Self {
        Self::Session(e)
    }
}

impl From<DisplayFailure> for Error {
    fn from(e: DisplayFailure) -> Self {
        Self::Display(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReadFailure {
    /// The particulate sensor's serial stream failed.
    Serial(io::ErrorKind),
    /// An I2C transfer to an onboard sensor failed.
    Bus {
        device: &'static str,
        kind: embedded_hal::i2c::ErrorKind,
    },
    /// The device answered with the wrong WHO_AM_I value.
    UnexpectedId { device: &'static str, found: u8 },
    /// A stop was requested while waiting on the serial stream.
    Cancelled,
}

impl fmt::Display for SensorReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial(kind) => write!(f, "serial read failed ({kind})"),
            Self::Bus { device, kind } => write!(f, "{device} I2C transfer failed ({kind:?})"),
            Self::UnexpectedId { device, found } => {
                write!(f, "{device} reported unexpected id 0x{found:02X}")
            }
            Self::Cancelled => write!(f, "read cancelled by stop request"),
        }
    }
}

impl std::error::Error for SensorReadFailure {}

// ---------------------------------------------------------------------------
// Telemetry session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOpenFailure {
    /// A certificate, key, or CA file could not be read.
    Credentials { path: String, kind: io::ErrorKind },
    /// The broker could not be reached or dropped the handshake.
    Connect(String),
    /// The broker refused the connection.
    Refused(String),
}

impl fmt::Display for SessionOpenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials { path, kind } => write!(f, "cannot read {path} ({kind})"),
            Self::Connect(msg) => write!(f, "connect failed: {msg}"),
            Self::Refused(code) => write!(f, "broker refused connection: {code}"),
        }
    }
}

impl std::error::Error for SessionOpenFailure {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishFailure {
    /// The session is not in the `Connected` state.
    NotConnected,
    /// The sequence number ran past the run's maximum.
    SequenceOverrun { sequence: u32, max: u32 },
    /// The envelope could not be encoded.
    Encode(String),
    /// The transport refused the message.
    Transport(String),
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "session not connected"),
            Self::SequenceOverrun { sequence, max } => {
                write!(f, "sequence {sequence} exceeds run maximum {max}")
            }
            Self::Encode(msg) => write!(f, "encode failed: {msg}"),
            Self::Transport(msg) => write!(f, "transport rejected publish: {msg}"),
        }
    }
}

impl std::error::Error for PublishFailure {}

// ---------------------------------------------------------------------------
// Run label resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigResolutionFailure {
    /// The request never produced a response.
    Network(String),
    /// The endpoint answered with a non-success status.
    Status(u16),
    /// The body was not a JSON object.
    Malformed(String),
    /// The object has no entry for this client.
    MissingKey(String),
    /// The entry exists but cannot be used in a topic.
    InvalidLabel(String),
}

impl fmt::Display for ConfigResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "request failed: {msg}"),
            Self::Status(code) => write!(f, "unexpected HTTP status {code}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
            Self::MissingKey(key) => write!(f, "no run entry for '{key}'"),
            Self::InvalidLabel(label) => write!(f, "unusable run label '{label}'"),
        }
    }
}

impl std::error::Error for ConfigResolutionFailure {}

// ---------------------------------------------------------------------------
// Display errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFailure {
    /// No LED-matrix framebuffer is present.
    NotFound,
    /// Writing to the framebuffer failed.
    Io(io::ErrorKind),
    /// Pixel coordinates outside the 8×8 grid.
    OutOfBounds { row: u8, col: u8 },
}

impl fmt::Display for DisplayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "LED matrix framebuffer not found"),
            Self::Io(kind) => write!(f, "framebuffer write failed ({kind})"),
            Self::OutOfBounds { row, col } => write!(f, "pixel ({row}, {col}) outside grid"),
        }
    }
}

impl std::error::Error for DisplayFailure {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io { path: String, source: io::Error },
    /// The config file is not valid JSON for [`AgentConfig`](crate::config::AgentConfig).
    Parse(serde_json::Error),
    /// A field failed range validation.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {path}: {source}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
