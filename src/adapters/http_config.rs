//! HTTPS run-config source.

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;

use crate::app::ports::RunConfigSource;
use crate::config::AgentConfig;
use crate::error::ConfigResolutionFailure;

pub struct HttpRunConfigSource {
    /// The builder error when no client could be built.
    client: Result<Client, String>,
    url: String,
}

impl HttpRunConfigSource {
    pub fn new(url: impl Into<String>, timeout: Duration, accept_invalid_certs: bool) -> Self {
        // Without a client every fetch fails and the run falls back to the
        // default label.
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| {
                warn!("Run: HTTP client unavailable: {}", e);
                e.to_string()
            });
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.run_config_url.clone(),
            config.run_config_timeout(),
            config.accept_invalid_certs,
        )
    }
}

impl RunConfigSource for HttpRunConfigSource {
    async fn fetch(&self) -> Result<String, ConfigResolutionFailure> {
        debug!("Run: fetching {}", self.url);
        let client = self
            .client
            .as_ref()
            .map_err(|e| ConfigResolutionFailure::Network(e.clone()))?;
        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ConfigResolutionFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigResolutionFailure::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| ConfigResolutionFailure::Network(e.to_string()))
    }
}
