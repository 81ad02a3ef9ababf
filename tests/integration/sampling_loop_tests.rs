//! Sampling loop against mocks, on a paused tokio clock.
//!
//! With `start_paused` the runtime jumps straight to the next timer once
//! every task is idle, so a full 720 × 30 s run finishes instantly while
//! still observing the real interval arithmetic.

use std::time::Duration;

use aq_telemetry::app::context::SessionContext;
use aq_telemetry::config::{MAX_SAMPLES, SAMPLE_INTERVAL};
use aq_telemetry::error::{DisplayFailure, Error, SensorReadFailure};
use aq_telemetry::scheduler::{RunOutcome, SamplingLoop, StopReason};
use tokio::time::Instant;

use crate::mock_hw::{
    fixed_clock, test_config, Call, FixedSource, Journal, MockDisplay, MockEnvironment,
    MockParticulate, MockTransport,
};

type Ctx = SessionContext<MockDisplay, MockTransport, MockEnvironment, MockParticulate>;

async fn context(journal: &Journal, transport: MockTransport, particulate: MockParticulate) -> Ctx {
    context_with(
        journal,
        MockDisplay::new(journal),
        transport,
        MockEnvironment::default(),
        particulate,
    )
    .await
}

async fn context_with(
    journal: &Journal,
    display: MockDisplay,
    transport: MockTransport,
    environment: MockEnvironment,
    particulate: MockParticulate,
) -> Ctx {
    let config = test_config();
    let source = FixedSource::serving(journal, r#"{"control": "bench"}"#);
    SessionContext::establish(
        display,
        &config,
        &source,
        transport,
        fixed_clock,
        || Ok(environment),
        || Ok(particulate),
    )
    .await
    .unwrap()
}

async fn stop_after(delay: Duration, reason: StopReason) -> StopReason {
    tokio::time::sleep(delay).await;
    reason
}

#[tokio::test(start_paused = true)]
async fn full_run_publishes_gapless_sequence() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::new(&journal),
        MockParticulate::new(&journal),
    )
    .await;
    let started = Instant::now();

    let outcome = SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL)
        .run(&mut ctx, std::future::pending())
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Completed { cycles: 720 });
    // 719 waits: none after the final cycle.
    assert_eq!(started.elapsed(), SAMPLE_INTERVAL * 719);

    let published = journal.published();
    assert_eq!(published.len(), 720);
    for (i, msg) in published.iter().enumerate() {
        assert_eq!(msg["num"], i as u64 + 1);
        assert_eq!(msg["max"], 720);
    }
    assert!(journal.topics().iter().all(|t| t == "aq/control/bench"));

    let last = &published[719];
    assert_eq!(last["sensor_id"], "control");
    assert_eq!(last["run"], "aq/control/bench");
    assert_eq!(last["pm25"], 30.0);
    assert_eq!(last["pm10"], 5.8);
    assert_eq!(last["timestamp"], 1_700_000_000.0);

    // The final render fills the grid.
    assert_eq!(journal.lit_since_last_clear(), 64);

    ctx.release();
    assert_eq!(journal.lit_since_last_clear(), 0);
    assert_eq!(journal.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn each_cycle_reads_then_publishes_then_renders() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::new(&journal),
        MockParticulate::new(&journal),
    )
    .await;

    SamplingLoop::new(2, SAMPLE_INTERVAL)
        .run(&mut ctx, std::future::pending())
        .await
        .unwrap();

    let calls = journal.calls();
    let read = calls
        .iter()
        .position(|c| *c == Call::ReadParticulates)
        .unwrap();
    assert!(matches!(calls[read + 1], Call::Publish { .. }));
    assert_eq!(calls[read + 2], Call::Clear);
}

#[tokio::test(start_paused = true)]
async fn publish_failure_does_not_stop_the_run() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::failing_on(&journal, vec![2]),
        MockParticulate::new(&journal),
    )
    .await;

    let outcome = SamplingLoop::new(3, SAMPLE_INTERVAL)
        .run(&mut ctx, std::future::pending())
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Completed { cycles: 3 });
    let nums: Vec<_> = journal.published().iter().map(|m| m["num"].clone()).collect();
    assert_eq!(nums, vec![1, 3]);
    assert_eq!(ctx.stats().attempted, 3);
    assert_eq!(ctx.stats().failed, 1);
}

#[tokio::test(start_paused = true)]
async fn sensor_failure_ends_run_with_single_cleanup() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::new(&journal),
        MockParticulate::failing_from(&journal, 4),
    )
    .await;
    let mut sampler = SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL);

    let result = sampler.run(&mut ctx, std::future::pending()).await;

    assert!(matches!(
        result,
        Err(Error::Sensor(SensorReadFailure::Serial(_)))
    ));
    assert_eq!(sampler.completed(), 3);
    assert_eq!(journal.published().len(), 3);

    let clears_before = journal.clears();
    ctx.release();
    drop(ctx);
    assert_eq!(journal.clears(), clears_before + 1);
    assert_eq!(journal.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_drains_after_final_publish() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::new(&journal),
        MockParticulate::new(&journal),
    )
    .await;

    SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL)
        .run(&mut ctx, std::future::pending())
        .await
        .unwrap();
    ctx.shutdown().await;
    ctx.shutdown().await;

    let calls = journal.calls();
    let last_publish = calls
        .iter()
        .rposition(|c| matches!(c, Call::Publish { .. }))
        .unwrap();
    let shutdown = journal.position(|c| *c == Call::Shutdown).unwrap();
    assert!(shutdown > last_publish);
    assert_eq!(journal.published().len(), 720);
    assert_eq!(journal.shutdowns(), 1);
    assert_eq!(journal.lit_since_last_clear(), 0);
    assert!(ctx.is_released());

    // Nothing left for drop to do.
    let calls_before_drop = journal.calls().len();
    drop(ctx);
    assert_eq!(journal.calls().len(), calls_before_drop);
    assert_eq!(journal.disconnects(), 0);
}

#[tokio::test(start_paused = true)]
async fn render_failure_ends_run_with_single_cleanup() {
    let journal = Journal::default();
    let mut ctx = context_with(
        &journal,
        MockDisplay::failing_pixels(&journal),
        MockTransport::new(&journal),
        MockEnvironment::default(),
        MockParticulate::new(&journal),
    )
    .await;
    let mut sampler = SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL);

    // Cycles 1-5 light nothing (round(64 * 5 / 720) = 0); cycle 6 lights
    // its first cell.
    let result = sampler.run(&mut ctx, std::future::pending()).await;

    assert!(matches!(result, Err(Error::Display(DisplayFailure::Io(_)))));
    assert_eq!(sampler.completed(), 5);
    assert_eq!(journal.published().len(), 6);

    let clears_before = journal.clears();
    ctx.release();
    drop(ctx);
    assert_eq!(journal.clears(), clears_before + 1);
    assert_eq!(journal.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn environment_failure_ends_run_with_single_cleanup() {
    let journal = Journal::default();
    let mut ctx = context_with(
        &journal,
        MockDisplay::new(&journal),
        MockTransport::new(&journal),
        MockEnvironment::failing_from(3),
        MockParticulate::new(&journal),
    )
    .await;
    let mut sampler = SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL);

    let result = sampler.run(&mut ctx, std::future::pending()).await;

    assert!(matches!(
        result,
        Err(Error::Sensor(SensorReadFailure::Bus { device: "LPS25H", .. }))
    ));
    assert_eq!(sampler.completed(), 2);
    assert_eq!(journal.published().len(), 2);

    let clears_before = journal.clears();
    ctx.release();
    drop(ctx);
    assert_eq!(journal.clears(), clears_before + 1);
    assert_eq!(journal.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_read_reports_the_stop_reason() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::new(&journal),
        MockParticulate::cancelled_from(&journal, 2),
    )
    .await;

    // The second read gives up at t = 30 s; the reason arrives just after.
    let outcome = SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL)
        .run(
            &mut ctx,
            stop_after(Duration::from_secs(31), StopReason::Terminate),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            reason: StopReason::Terminate,
            cycles: 1,
        }
    );
    assert_eq!(journal.published().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn interrupt_during_wait_stops_after_current_cycle() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::new(&journal),
        MockParticulate::new(&journal),
    )
    .await;

    // Cycles run at t = 0, 30, 60; the stop lands mid-wait at 75 s.
    let outcome = SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL)
        .run(
            &mut ctx,
            stop_after(Duration::from_secs(75), StopReason::Interrupt),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            reason: StopReason::Interrupt,
            cycles: 3,
        }
    );
    assert_eq!(journal.published().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn pending_stop_prevents_first_cycle() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::new(&journal),
        MockParticulate::new(&journal),
    )
    .await;

    let outcome = SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL)
        .run(&mut ctx, std::future::ready(StopReason::Terminate))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            reason: StopReason::Terminate,
            cycles: 0,
        }
    );
    assert_eq!(journal.count(|c| *c == Call::ReadParticulates), 0);
}

#[tokio::test(start_paused = true)]
async fn progress_tracks_completed_cycles() {
    let journal = Journal::default();
    let mut ctx = context(
        &journal,
        MockTransport::new(&journal),
        MockParticulate::new(&journal),
    )
    .await;

    // 360 of 720 cycles: four full rows.
    SamplingLoop::new(MAX_SAMPLES, SAMPLE_INTERVAL)
        .run(
            &mut ctx,
            stop_after(SAMPLE_INTERVAL * 359 + Duration::from_secs(1), StopReason::Terminate),
        )
        .await
        .unwrap();

    assert_eq!(journal.lit_since_last_clear(), 32);
}
