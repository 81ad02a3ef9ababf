//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter       | Implements         | Connects to                    |
//! |---------------|--------------------|--------------------------------|
//! | `mqtt`        | TelemetryTransport | MQTT broker, mutual TLS        |
//! | `http_config` | RunConfigSource    | HTTPS run-config host          |
//! | `serial`      | ParticulateSensor  | SDS011 on a USB serial adapter |
//! | `signals`     | —                  | SIGINT / SIGTERM, stop flag    |
//! | `time`        | —                  | System wall clock              |
//!
//! Everything except `time` needs the `device` feature.

#[cfg(feature = "device")]
pub mod http_config;
#[cfg(feature = "device")]
pub mod mqtt;
#[cfg(feature = "device")]
pub mod serial;
#[cfg(feature = "device")]
pub mod signals;
pub mod time;
