//! Telemetry session: connection lifecycle and message envelopes.
//!
//! ```text
//!   Connecting ──open ok──▶ Connected ──close──▶ Terminating ──▶ Closed
//!        │                                                        ▲
//!        └──────────────────────open failed───────────────────────┘
//! ```
//!
//! There is no path back to `Connecting`.  If the transport drops the
//! connection mid-run, publishes start failing; each failure is logged
//! and the run carries on.

use log::{info, warn};
use serde::Serialize;

use super::ports::TelemetryTransport;
use super::run_config::RunConfig;
use crate::config::TOPIC_PREFIX;
use crate::error::{PublishFailure, SessionOpenFailure};

/// One cycle's measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub pm25: f64,
    pub pm10: f64,
    pub pressure: f64,
    pub humidity: f64,
}

/// The message published for one cycle.
///
/// Serialises to a flat JSON object:
/// `pm25, pm10, pressure, humidity, timestamp, sensor_id, num, max, run`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    #[serde(flatten)]
    pub reading: Reading,
    /// UNIX time in seconds.
    pub timestamp: f64,
    pub sensor_id: &'a str,
    #[serde(rename = "num")]
    pub sequence: u32,
    #[serde(rename = "max")]
    pub max_sequence: u32,
    /// The full topic the message is published on.
    pub run: &'a str,
}

impl Envelope<'_> {
    pub fn to_json(&self) -> Result<Vec<u8>, PublishFailure> {
        serde_json::to_vec(self).map_err(|e| PublishFailure::Encode(e.to_string()))
    }
}

/// Build the topic a client publishes to for a run.
pub fn topic_for(client_id: &str, run: &RunConfig) -> String {
    format!("{TOPIC_PREFIX}/{client_id}/{}", run.label())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Terminating,
    Closed,
}

/// Publish outcomes over the life of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub attempted: u32,
    pub failed: u32,
}

/// Owns the transport for the session's lifetime.
///
/// Dropping a live session closes it.
pub struct TelemetrySession<T: TelemetryTransport> {
    transport: T,
    client_id: String,
    topic: String,
    state: SessionState,
    stats: PublishStats,
    clock: fn() -> f64,
}

impl<T: TelemetryTransport> TelemetrySession<T> {
    /// Connect `transport` and return a live session.
    ///
    /// Waits for the broker to confirm the connection.  On failure the
    /// transport is told to disconnect and dropped.
    pub async fn open(
        mut transport: T,
        client_id: &str,
        run: &RunConfig,
        clock: fn() -> f64,
    ) -> Result<Self, SessionOpenFailure> {
        let topic = topic_for(client_id, run);
        info!("Telemetry: connecting as '{}'", client_id);

        if let Err(e) = transport.connect().await {
            transport.disconnect();
            return Err(e);
        }

        info!("Telemetry: connected, publishing to '{}'", topic);
        Ok(Self {
            transport,
            client_id: client_id.to_owned(),
            topic,
            state: SessionState::Connected,
            stats: PublishStats::default(),
            clock,
        })
    }

    /// Publish one reading as cycle `sequence` of `max_sequence`.
    ///
    /// Failures are returned for logging; they never change the session
    /// state.
    pub async fn publish(
        &mut self,
        reading: &Reading,
        sequence: u32,
        max_sequence: u32,
    ) -> Result<(), PublishFailure> {
        self.stats.attempted += 1;
        let result = self.try_publish(reading, sequence, max_sequence).await;
        if result.is_err() {
            self.stats.failed += 1;
        }
        result
    }

    async fn try_publish(
        &mut self,
        reading: &Reading,
        sequence: u32,
        max_sequence: u32,
    ) -> Result<(), PublishFailure> {
        if self.state != SessionState::Connected {
            return Err(PublishFailure::NotConnected);
        }
        if sequence > max_sequence {
            return Err(PublishFailure::SequenceOverrun {
                sequence,
                max: max_sequence,
            });
        }

        let payload = Envelope {
            reading: *reading,
            timestamp: (self.clock)(),
            sensor_id: &self.client_id,
            sequence,
            max_sequence,
            run: &self.topic,
        }
        .to_json()?;

        self.transport.publish(&self.topic, payload).await
    }

    /// Flush queued messages and disconnect, waiting for the transport to
    /// finish.  Safe to call any number of times, and after [`close`](Self::close).
    pub async fn shutdown(&mut self) {
        match self.state {
            SessionState::Connecting | SessionState::Connected => {
                self.state = SessionState::Terminating;
                info!("Telemetry: draining and disconnecting");
                self.transport.shutdown().await;
                self.state = SessionState::Closed;
            }
            SessionState::Terminating | SessionState::Closed => {}
        }
    }

    /// Tear the connection down without waiting.  Safe to call any number
    /// of times.
    pub fn close(&mut self) {
        match self.state {
            SessionState::Connecting | SessionState::Connected => {
                self.state = SessionState::Terminating;
                info!("Telemetry: disconnecting");
                self.transport.disconnect();
                self.state = SessionState::Closed;
            }
            SessionState::Terminating | SessionState::Closed => {}
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn stats(&self) -> PublishStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: TelemetryTransport> Drop for TelemetrySession<T> {
    fn drop(&mut self) {
        if self.state == SessionState::Connected {
            warn!("Telemetry: session dropped while connected, closing");
        }
        self.close();
    }
}
