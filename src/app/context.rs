//! Session context — every resource a run owns, released exactly once.
//!
//! [`SessionContext`] is built once at startup, handed by `&mut` to the
//! [`SamplingLoop`](crate::scheduler::SamplingLoop), and torn down by
//! [`release`](SessionContext::release).  `release` also runs on drop, so
//! completion, fatal errors, interrupts and unwinding all converge on the
//! same cleanup: clear the display, close the telemetry session.

use log::{error, info};

use super::ports::{
    EnvironmentSensor, LedMatrix, ParticulateSensor, RunConfigSource, TelemetryTransport,
};
use super::progress::{ProgressFill, ProgressIndicator};
use super::run_config::{self, RunConfig};
use super::telemetry::{PublishStats, Reading, TelemetrySession};
use crate::config::AgentConfig;
use crate::error::{DisplayFailure, Error, PublishFailure, SensorReadFailure};

pub struct SessionContext<D, T, E, P>
where
    D: LedMatrix,
    T: TelemetryTransport,
{
    display: D,
    session: TelemetrySession<T>,
    environment: E,
    particulate: P,
    run: RunConfig,
    progress: ProgressIndicator,
    released: bool,
}

impl<D, T, E, P> SessionContext<D, T, E, P>
where
    D: LedMatrix,
    T: TelemetryTransport,
    E: EnvironmentSensor,
    P: ParticulateSensor,
{
    /// Bring a run up.  The display must already be available.
    ///
    /// Order: resolve the run label → open the telemetry session → probe
    /// the environmental sensor → open the particulate sensor.  A failing
    /// step clears the display, releases whatever was already acquired,
    /// and returns the error.  Run-label lookup never fails.
    pub async fn establish<S, FE, FP>(
        mut display: D,
        config: &AgentConfig,
        source: &S,
        transport: T,
        clock: fn() -> f64,
        open_environment: FE,
        open_particulate: FP,
    ) -> Result<Self, Error>
    where
        S: RunConfigSource,
        FE: FnOnce() -> Result<E, Error>,
        FP: FnOnce() -> Result<P, Error>,
    {
        let run = run_config::resolve(source, &config.client_id, &config.default_run_label).await;

        let session =
            match TelemetrySession::open(transport, &config.client_id, &run, clock).await {
                Ok(session) => session,
                Err(e) => return Err(abort(&mut display, e.into())),
            };

        let environment = match open_environment() {
            Ok(env) => env,
            Err(e) => return Err(abort(&mut display, e)),
        };

        let particulate = match open_particulate() {
            Ok(pm) => pm,
            Err(e) => return Err(abort(&mut display, e)),
        };

        info!("Session established for run '{}'", run.label());
        Ok(Self {
            display,
            session,
            environment,
            particulate,
            run,
            progress: ProgressIndicator::default(),
            released: false,
        })
    }

    /// Take one reading from both sensors.
    pub fn acquire(&mut self) -> Result<Reading, SensorReadFailure> {
        let pm = self.particulate.read_particulates()?;
        let pressure = self.environment.pressure()?;
        let humidity = self.environment.humidity()?;
        Ok(Reading {
            pm25: pm.pm25,
            pm10: pm.pm10,
            pressure,
            humidity,
        })
    }

    pub async fn publish(
        &mut self,
        reading: &Reading,
        sequence: u32,
        max_sequence: u32,
    ) -> Result<(), PublishFailure> {
        self.session.publish(reading, sequence, max_sequence).await
    }

    pub fn render(&mut self, completed: u32, total: u32) -> Result<ProgressFill, DisplayFailure> {
        self.progress.render(&mut self.display, completed, total)
    }
}

impl<D, T, E, P> SessionContext<D, T, E, P>
where
    D: LedMatrix,
    T: TelemetryTransport,
{
    /// Clear the display, deliver any queued telemetry and disconnect.
    ///
    /// The normal way to end a run.  Only the first call of this or
    /// [`release`](Self::release) has any effect.
    pub async fn shutdown(&mut self) {
        if self.begin_release() {
            self.session.shutdown().await;
            self.log_summary();
        }
    }

    /// Clear the display and close the session without waiting for the
    /// transport.  Only the first call of this or
    /// [`shutdown`](Self::shutdown) has any effect; also runs on drop.
    pub fn release(&mut self) {
        if self.begin_release() {
            self.session.close();
            self.log_summary();
        }
    }

    fn begin_release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        if let Err(e) = self.display.clear() {
            error!("Cleanup: display clear failed: {}", e);
        }
        true
    }

    fn log_summary(&self) {
        let stats = self.session.stats();
        info!(
            "Cleanup: done (run '{}', {} published, {} dropped)",
            self.run.label(),
            stats.attempted - stats.failed,
            stats.failed
        );
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn run(&self) -> &RunConfig {
        &self.run
    }

    pub fn stats(&self) -> PublishStats {
        self.session.stats()
    }

    pub fn session(&self) -> &TelemetrySession<T> {
        &self.session
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

impl<D, T, E, P> Drop for SessionContext<D, T, E, P>
where
    D: LedMatrix,
    T: TelemetryTransport,
{
    fn drop(&mut self) {
        self.release();
    }
}

/// Best-effort display clear on a startup failure.
fn abort(display: &mut impl LedMatrix, err: Error) -> Error {
    error!("Startup failed: {}", err);
    if let Err(e) = display.clear() {
        error!("Cleanup: display clear failed: {}", e);
    }
    err
}
