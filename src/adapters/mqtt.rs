//! MQTT transport over mutual TLS.
//!
//! ```text
//!   connect ── reads cert/key/CA from disk
//!         │
//!         ├── polls the event loop until CONNACK
//!         │
//!         └── spawns the driver task ── polls until the first error
//! ```
//!
//! `shutdown` queues a DISCONNECT behind any pending publishes and waits,
//! bounded by [`DRAIN_TIMEOUT`], for the driver to write it out and exit.
//! The driver never reconnects.  Once it exits, every publish fails with
//! `NotConnected` and the sampling loop logs and carries on.

use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    TlsConfiguration, Transport,
};
use tokio::task::JoinHandle;

use crate::app::ports::TelemetryTransport;
use crate::config::AgentConfig;
use crate::error::{PublishFailure, SessionOpenFailure};

/// Upper bound on the wait for CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests buffered between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 16;

/// Upper bound on the wait for queued packets and the DISCONNECT to reach
/// the wire during shutdown.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Paths to the PEM files for mutual TLS.
#[derive(Debug, Clone)]
struct Credentials {
    root_ca: String,
    cert: String,
    key: String,
}

impl Credentials {
    fn load(&self) -> Result<TlsConfiguration, SessionOpenFailure> {
        Ok(TlsConfiguration::Simple {
            ca: read_credential(&self.root_ca)?,
            alpn: None,
            client_auth: Some((read_credential(&self.cert)?, read_credential(&self.key)?)),
        })
    }
}

pub struct MqttTransport {
    options: Option<MqttOptions>,
    /// `None` only for plain-TCP test brokers.
    credentials: Option<Credentials>,
    client: Option<AsyncClient>,
    driver: Option<JoinHandle<()>>,
}

impl MqttTransport {
    pub fn new(config: &AgentConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.endpoint, config.port);
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(false);

        Self {
            options: Some(options),
            credentials: Some(Credentials {
                root_ca: config.root_ca_path.clone(),
                cert: config.cert_path.clone(),
                key: config.key_path.clone(),
            }),
            client: None,
            driver: None,
        }
    }

    #[cfg(test)]
    fn plain(options: MqttOptions) -> Self {
        Self {
            options: Some(options),
            credentials: None,
            client: None,
            driver: None,
        }
    }

    fn driver_alive(&self) -> bool {
        self.driver.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl TelemetryTransport for MqttTransport {
    async fn connect(&mut self) -> Result<(), SessionOpenFailure> {
        let mut options = self
            .options
            .take()
            .ok_or_else(|| SessionOpenFailure::Connect("transport already used".into()))?;
        if let Some(credentials) = &self.credentials {
            options.set_transport(Transport::tls_with_config(credentials.load()?));
        }
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        tokio::time::timeout(CONNECT_TIMEOUT, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| SessionOpenFailure::Connect("timed out waiting for CONNACK".into()))??;

        self.client = Some(client);
        self.driver = Some(tokio::spawn(drive(eventloop)));
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublishFailure> {
        if !self.driver_alive() {
            return Err(PublishFailure::NotConnected);
        }
        let client = self.client.as_ref().ok_or(PublishFailure::NotConnected)?;
        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| PublishFailure::Transport(e.to_string()))
    }

    async fn shutdown(&mut self) {
        self.disconnect();
        let Some(driver) = self.driver.take() else {
            return;
        };
        match tokio::time::timeout(DRAIN_TIMEOUT, driver).await {
            Ok(Ok(())) => info!("mqtt: disconnected"),
            Ok(Err(e)) => warn!("mqtt: driver task failed: {}", e),
            Err(_) => warn!(
                "mqtt: queue not drained within {}s, abandoning",
                DRAIN_TIMEOUT.as_secs()
            ),
        }
    }

    fn disconnect(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        if let Err(e) = client.try_disconnect() {
            debug!("mqtt: disconnect request not queued: {}", e);
        }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), SessionOpenFailure> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return if ack.code == ConnectReturnCode::Success {
                    info!("mqtt: connected (session present: {})", ack.session_present);
                    Ok(())
                } else {
                    Err(SessionOpenFailure::Refused(format!("{:?}", ack.code)))
                };
            }
            Ok(event) => debug!("mqtt: {:?}", event),
            Err(e) => return Err(SessionOpenFailure::Connect(e.to_string())),
        }
    }
}

async fn drive(mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::PubAck(ack))) => debug!("mqtt: puback {}", ack.pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("mqtt: disconnect sent");
                break;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("mqtt: broker closed the session");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("mqtt: connection lost: {}", e);
                break;
            }
        }
    }
}

fn read_credential(path: &str) -> Result<Vec<u8>, SessionOpenFailure> {
    std::fs::read(path).map_err(|e| SessionOpenFailure::Credentials {
        path: path.to_owned(),
        kind: e.kind(),
    })
}
