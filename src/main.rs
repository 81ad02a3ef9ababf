//! Air-quality telemetry agent — main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SenseHatMatrix   SenseHatEnvironment   Sds011 (serial)        │
//! │  (LedMatrix)      (EnvironmentSensor)   (ParticulateSensor)    │
//! │  MqttTransport    HttpRunConfigSource   SignalWatcher          │
//! │  (Telemetry)      (RunConfigSource)     (SIGINT / SIGTERM)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │      SessionContext · TelemetrySession · Progress      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  SamplingLoop (720 × 30 s, races the stop signal)              │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};

use aq_telemetry::adapters::http_config::HttpRunConfigSource;
use aq_telemetry::adapters::mqtt::MqttTransport;
use aq_telemetry::adapters::serial::open_sds011;
use aq_telemetry::adapters::signals::SignalWatcher;
use aq_telemetry::adapters::time::unix_time_secs;
use aq_telemetry::app::context::SessionContext;
use aq_telemetry::config::{AgentConfig, MAX_SAMPLES, SAMPLE_INTERVAL};
use aq_telemetry::drivers::led_matrix::SenseHatMatrix;
use aq_telemetry::drivers::sense_hat::open_environment;
use aq_telemetry::error::Error;
use aq_telemetry::scheduler::{RunOutcome, SamplingLoop};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── Configuration ─────────────────────────────────────────
    let config = AgentConfig::from_env()
        .map_err(Error::from)
        .context("loading agent configuration")?;
    info!(
        "aq-telemetry v{} starting as '{}' ({} samples every {}s)",
        env!("CARGO_PKG_VERSION"),
        config.client_id,
        MAX_SAMPLES,
        SAMPLE_INTERVAL.as_secs()
    );

    // ── Startup ───────────────────────────────────────────────
    let signals = SignalWatcher::spawn().context("installing signal handlers")?;
    let stop = signals.stop_flag();

    // The display is needed first: every later startup failure clears it.
    let display = SenseHatMatrix::open()?;
    let source = HttpRunConfigSource::from_config(&config);
    let transport = MqttTransport::new(&config);

    let mut ctx = SessionContext::establish(
        display,
        &config,
        &source,
        transport,
        unix_time_secs,
        || open_environment(&config.i2c_bus),
        || open_sds011(&config.serial_path, config.serial_baud, Arc::clone(&stop)),
    )
    .await?;

    // ── Run ───────────────────────────────────────────────────
    let mut sampler = SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL);
    let outcome = sampler.run(&mut ctx, signals.stopped()).await;
    if let Err(e) = &outcome {
        error!("Run aborted after {} cycles: {}", sampler.completed(), e);
    }
    ctx.shutdown().await;

    match outcome? {
        RunOutcome::Completed { cycles } => info!("Run complete: {} cycles", cycles),
        RunOutcome::Interrupted { reason, cycles } => {
            info!("Run stopped by {:?} after {} cycles", reason, cycles);
        }
    }
    Ok(())
}
