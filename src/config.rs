//! Agent configuration.
//!
//! Deployment parameters (identity, endpoints, credential paths, device
//! nodes) live in [`AgentConfig`] and can be overridden from a JSON file.
//! The run shape itself (sample count, interval, topic prefix) is fixed at
//! compile time.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Samples taken in one run.
pub const MAX_SAMPLES: u32 = 720;

/// Delay between the end of one cycle and the start of the next.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

/// First topic segment for every telemetry message.
pub const TOPIC_PREFIX: &str = "aq";

/// Environment variable naming an optional JSON config file.
pub const CONFIG_PATH_ENV: &str = "AQ_AGENT_CONFIG";

/// Deployment configuration, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // --- Identity ---
    /// MQTT client id; also the key looked up in the run config and the
    /// `sensor_id` stamped on every envelope.
    pub client_id: String,

    // --- Broker ---
    pub endpoint: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    pub cert_path: String,
    pub key_path: String,
    pub root_ca_path: String,

    // --- Run label lookup ---
    pub run_config_url: String,
    pub run_config_timeout_secs: u64,
    /// Skip TLS certificate validation for the run lookup.  Only meant for
    /// a config host on a trusted internal network with a private CA.
    pub accept_invalid_certs: bool,
    pub default_run_label: String,

    // --- Devices ---
    pub serial_path: String,
    pub serial_baud: u32,
    pub i2c_bus: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            client_id: "control".into(),

            endpoint: "a1qecpjelyfwp0-ats.iot.us-east-1.amazonaws.com".into(),
            port: 8883,
            keep_alive_secs: 6,
            cert_path: "/home/pi/aq/certs/certificate.pem.crt".into(),
            key_path: "/home/pi/aq/certs/private.pem.key".into(),
            root_ca_path: "/home/pi/aq/certs/AmazonRootCA1.pem".into(),

            run_config_url: "https://rec.home/AQ/runs.json".into(),
            run_config_timeout_secs: 10,
            accept_invalid_certs: false,
            default_run_label: "default".into(),

            serial_path: "/dev/ttyUSB0".into(),
            serial_baud: 9600,
            i2c_bus: "/dev/i2c-1".into(),
        }
    }
}

impl AgentConfig {
    /// Load from `path`, or return defaults when no path is given.
    ///
    /// Fields missing from the file keep their default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by [`CONFIG_PATH_ENV`], if set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV);
        Self::load(path.as_deref().map(Path::new))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("client_id must not be empty"));
        }
        if self.client_id.contains(['/', '+', '#']) {
            return Err(ConfigError::ValidationFailed(
                "client_id must not contain topic separators or wildcards",
            ));
        }
        if self.endpoint.is_empty() {
            return Err(ConfigError::ValidationFailed("endpoint must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::ValidationFailed("port must be non-zero"));
        }
        if self.keep_alive_secs < 5 {
            return Err(ConfigError::ValidationFailed("keep_alive_secs must be at least 5"));
        }
        if self.run_config_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "run_config_timeout_secs must be non-zero",
            ));
        }
        if self.default_run_label.is_empty() {
            return Err(ConfigError::ValidationFailed("default_run_label must not be empty"));
        }
        if self.serial_baud == 0 {
            return Err(ConfigError::ValidationFailed("serial_baud must be non-zero"));
        }
        Ok(())
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn run_config_timeout(&self) -> Duration {
        Duration::from_secs(self.run_config_timeout_secs)
    }
}
