//! Sampling loop — the fixed-interval cycle driver.
//!
//! ```text
//! ┌──────────────────────────── cycle n of max ─────────────────────────────┐
//! │                                                                         │
//! │  acquire ──▶ publish ──▶ render ──▶ sleep(interval) ──▶ cycle n+1       │
//! │  (fatal)     (logged)    (fatal)    (races shutdown)                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop ends when the counter is exhausted, the shutdown future
//! resolves, or a sensor/display error escapes a cycle.  Cleanup is not
//! done here: the caller owns the [`SessionContext`] and its release.

use core::future::Future;
use std::time::Duration;

use log::{info, warn};

use crate::app::context::SessionContext;
use crate::app::ports::{EnvironmentSensor, LedMatrix, ParticulateSensor, TelemetryTransport};
use crate::error::{Error, SensorReadFailure};

// ═══════════════════════════════════════════════════════════════
//  Cycle counter
// ═══════════════════════════════════════════════════════════════

/// Counts cycles `1..=max`.  Running past `max` ends the run; it is not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleCounter {
    current: u32,
    max: u32,
}

impl CycleCounter {
    pub fn new(max: u32) -> Self {
        Self { current: 0, max }
    }

    /// Step to the next cycle and return its number, or `None` once `max`
    /// cycles have been handed out.
    pub fn advance(&mut self) -> Option<u32> {
        if self.current >= self.max {
            return None;
        }
        self.current += 1;
        Some(self.current)
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_exhausted(&self) -> bool {
        self.current >= self.max
    }
}

// ═══════════════════════════════════════════════════════════════
//  Outcomes
// ═══════════════════════════════════════════════════════════════

/// Why an external stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGTERM.
    Terminate,
    /// Console interrupt (Ctrl-C).
    Interrupt,
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every cycle ran.
    Completed { cycles: u32 },
    /// A stop was requested after `cycles` complete cycles.
    Interrupted { reason: StopReason, cycles: u32 },
}

// ═══════════════════════════════════════════════════════════════
//  Sampling loop
// ═══════════════════════════════════════════════════════════════

pub struct SamplingLoop {
    counter: CycleCounter,
    interval: Duration,
    completed: u32,
}

impl SamplingLoop {
    pub fn new(max_cycles: u32, interval: Duration) -> Self {
        Self {
            counter: CycleCounter::new(max_cycles),
            interval,
            completed: 0,
        }
    }

    /// Drive cycles until the run completes, `shutdown` resolves, or a
    /// cycle fails fatally.
    ///
    /// `shutdown` is checked before every cycle and raced against every
    /// inter-sample wait; a cycle in progress is never cut short, except
    /// that a particulate read stalled when the stop arrives gives up with
    /// [`SensorReadFailure::Cancelled`].  No wait follows the final cycle.
    pub async fn run<D, T, E, P>(
        &mut self,
        ctx: &mut SessionContext<D, T, E, P>,
        shutdown: impl Future<Output = StopReason>,
    ) -> Result<RunOutcome, Error>
    where
        D: LedMatrix,
        T: TelemetryTransport,
        E: EnvironmentSensor,
        P: ParticulateSensor,
    {
        tokio::pin!(shutdown);

        while let Some(sequence) = self.counter.advance() {
            let max = self.counter.max();

            // A stop that is already pending wins over starting a cycle; once
            // started, a cycle runs to completion.
            tokio::select! {
                biased;
                reason = &mut shutdown => return Ok(self.interrupted(reason)),
                () = core::future::ready(()) => {}
            }
            match Self::cycle(ctx, sequence, max).await {
                Ok(()) => {}
                // The serial read gave up because a stop signal arrived; the
                // reason follows on `shutdown`.
                Err(Error::Sensor(SensorReadFailure::Cancelled)) => {
                    let reason = (&mut shutdown).await;
                    return Ok(self.interrupted(reason));
                }
                Err(e) => return Err(e),
            }
            self.completed += 1;

            if self.counter.is_exhausted() {
                break;
            }

            tokio::select! {
                biased;
                reason = &mut shutdown => return Ok(self.interrupted(reason)),
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Max count reached, run complete ({} cycles)", self.completed);
        Ok(RunOutcome::Completed {
            cycles: self.completed,
        })
    }

    async fn cycle<D, T, E, P>(
        ctx: &mut SessionContext<D, T, E, P>,
        sequence: u32,
        max: u32,
    ) -> Result<(), Error>
    where
        D: LedMatrix,
        T: TelemetryTransport,
        E: EnvironmentSensor,
        P: ParticulateSensor,
    {
        info!("{} of {}", sequence, max);

        let reading = ctx.acquire()?;
        info!(
            "PM2.5={:.1} PM10={:.1} ug/m3 | P={:.2} hPa | RH={:.1}%",
            reading.pm25, reading.pm10, reading.pressure, reading.humidity
        );

        if let Err(e) = ctx.publish(&reading, sequence, max).await {
            warn!("Unable to publish reading {}: {}", sequence, e);
        }

        ctx.render(sequence, max)?;
        Ok(())
    }

    fn interrupted(&self, reason: StopReason) -> RunOutcome {
        warn!("Stop requested ({:?}) after {} cycles", reason, self.completed);
        RunOutcome::Interrupted {
            reason,
            cycles: self.completed,
        }
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }
}
