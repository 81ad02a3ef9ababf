//! Mock devices and network endpoints for integration tests.
//!
//! Every mock appends to one shared [`Journal`], so tests can assert on
//! the exact order of calls across display, sensors and transport without
//! touching real hardware or a broker.

use std::cell::RefCell;
use std::rc::Rc;

use aq_telemetry::app::ports::{
    EnvironmentSensor, LedMatrix, ParticulateSensor, RunConfigSource, TelemetryTransport,
};
use aq_telemetry::app::progress::Rgb;
use aq_telemetry::config::AgentConfig;
use aq_telemetry::error::{
    ConfigResolutionFailure, DisplayFailure, PublishFailure, SensorReadFailure,
    SessionOpenFailure,
};
use aq_telemetry::sensors::sds011::ParticulateReading;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchRunConfig,
    Connect,
    Publish { topic: String, payload: Vec<u8> },
    Disconnect,
    Shutdown,
    OpenEnvironment,
    OpenParticulate,
    ReadParticulates,
    Clear,
    SetPixel { row: u8, col: u8 },
}

#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Call>>>);

#[allow(dead_code)]
impl Journal {
    pub fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn clears(&self) -> usize {
        self.count(|c| *c == Call::Clear)
    }

    pub fn disconnects(&self) -> usize {
        self.count(|c| *c == Call::Disconnect)
    }

    pub fn shutdowns(&self) -> usize {
        self.count(|c| *c == Call::Shutdown)
    }

    /// Decoded payloads of every publish, in order.
    pub fn published(&self) -> Vec<serde_json::Value> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Publish { payload, .. } => serde_json::from_slice(payload).ok(),
                _ => None,
            })
            .collect()
    }

    pub fn topics(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Publish { topic, .. } => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }

    /// Pixels lit since the most recent clear.
    pub fn lit_since_last_clear(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .rev()
            .take_while(|c| **c != Call::Clear)
            .filter(|c| matches!(c, Call::SetPixel { .. }))
            .count()
    }

    /// The first position of a call matching `pred`.
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.0.borrow().iter().position(pred)
    }
}

// ── Display ───────────────────────────────────────────────────

pub struct MockDisplay {
    journal: Journal,
    /// Every `set_pixel` fails; `clear` still succeeds.
    fail_pixels: bool,
}

#[allow(dead_code)]
impl MockDisplay {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            fail_pixels: false,
        }
    }

    pub fn failing_pixels(journal: &Journal) -> Self {
        Self {
            fail_pixels: true,
            ..Self::new(journal)
        }
    }
}

impl LedMatrix for MockDisplay {
    fn clear(&mut self) -> Result<(), DisplayFailure> {
        self.journal.push(Call::Clear);
        Ok(())
    }

    fn set_pixel(&mut self, row: u8, col: u8, _colour: Rgb) -> Result<(), DisplayFailure> {
        if self.fail_pixels {
            return Err(DisplayFailure::Io(std::io::ErrorKind::Other));
        }
        self.journal.push(Call::SetPixel { row, col });
        Ok(())
    }
}

// ── Transport ─────────────────────────────────────────────────

pub struct MockTransport {
    journal: Journal,
    pub refuse_connect: bool,
    /// Publish calls (1-based) that fail.
    pub fail_publishes: Vec<u32>,
    publishes: u32,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            refuse_connect: false,
            fail_publishes: Vec::new(),
            publishes: 0,
        }
    }

    pub fn refusing(journal: &Journal) -> Self {
        Self {
            refuse_connect: true,
            ..Self::new(journal)
        }
    }

    pub fn failing_on(journal: &Journal, fail_publishes: Vec<u32>) -> Self {
        Self {
            fail_publishes,
            ..Self::new(journal)
        }
    }
}

impl TelemetryTransport for MockTransport {
    async fn connect(&mut self) -> Result<(), SessionOpenFailure> {
        self.journal.push(Call::Connect);
        if self.refuse_connect {
            return Err(SessionOpenFailure::Connect("connection refused".into()));
        }
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublishFailure> {
        self.publishes += 1;
        if self.fail_publishes.contains(&self.publishes) {
            return Err(PublishFailure::Transport("broker unreachable".into()));
        }
        self.journal.push(Call::Publish {
            topic: topic.to_owned(),
            payload,
        });
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.journal.push(Call::Shutdown);
    }

    fn disconnect(&mut self) {
        self.journal.push(Call::Disconnect);
    }
}

// ── Run-config source ─────────────────────────────────────────

pub struct FixedSource {
    journal: Journal,
    body: Result<String, ConfigResolutionFailure>,
}

#[allow(dead_code)]
impl FixedSource {
    pub fn serving(journal: &Journal, body: &str) -> Self {
        Self {
            journal: journal.clone(),
            body: Ok(body.to_owned()),
        }
    }

    pub fn unreachable(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            body: Err(ConfigResolutionFailure::Network("no route to host".into())),
        }
    }
}

impl RunConfigSource for FixedSource {
    async fn fetch(&self) -> Result<String, ConfigResolutionFailure> {
        self.journal.push(Call::FetchRunConfig);
        self.body.clone()
    }
}

// ── Sensors ───────────────────────────────────────────────────

pub struct MockEnvironment {
    pub pressure: f64,
    pub humidity: f64,
    /// Pressure reads (1-based) from which the bus errors.
    pub fail_from: Option<u32>,
    reads: u32,
}

impl Default for MockEnvironment {
    fn default() -> Self {
        Self {
            pressure: 1013.25,
            humidity: 41.5,
            fail_from: None,
            reads: 0,
        }
    }
}

#[allow(dead_code)]
impl MockEnvironment {
    pub fn failing_from(read: u32) -> Self {
        Self {
            fail_from: Some(read),
            ..Self::default()
        }
    }
}

impl EnvironmentSensor for MockEnvironment {
    fn pressure(&mut self) -> Result<f64, SensorReadFailure> {
        self.reads += 1;
        if self.fail_from.is_some_and(|n| self.reads >= n) {
            return Err(SensorReadFailure::Bus {
                device: "LPS25H",
                kind: embedded_hal::i2c::ErrorKind::Other,
            });
        }
        Ok(self.pressure)
    }

    fn humidity(&mut self) -> Result<f64, SensorReadFailure> {
        Ok(self.humidity)
    }
}

/// Returns the same reading every time, failing from read `fail_from` on.
pub struct MockParticulate {
    journal: Journal,
    reading: ParticulateReading,
    fail_from: Option<u32>,
    failure: SensorReadFailure,
    reads: u32,
}

#[allow(dead_code)]
impl MockParticulate {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            reading: ParticulateReading {
                pm25: 30.0,
                pm10: 5.8,
            },
            fail_from: None,
            failure: SensorReadFailure::Serial(std::io::ErrorKind::BrokenPipe),
            reads: 0,
        }
    }

    pub fn failing_from(journal: &Journal, read: u32) -> Self {
        Self {
            fail_from: Some(read),
            ..Self::new(journal)
        }
    }

    /// Behaves like a stalled serial read abandoned on a stop request.
    pub fn cancelled_from(journal: &Journal, read: u32) -> Self {
        Self {
            fail_from: Some(read),
            failure: SensorReadFailure::Cancelled,
            ..Self::new(journal)
        }
    }
}

impl ParticulateSensor for MockParticulate {
    fn read_particulates(&mut self) -> Result<ParticulateReading, SensorReadFailure> {
        self.reads += 1;
        self.journal.push(Call::ReadParticulates);
        if self.fail_from.is_some_and(|n| self.reads >= n) {
            return Err(self.failure);
        }
        Ok(self.reading)
    }
}

// ── Helpers ───────────────────────────────────────────────────

pub fn test_config() -> AgentConfig {
    AgentConfig::default()
}

pub fn fixed_clock() -> f64 {
    1_700_000_000.0
}
