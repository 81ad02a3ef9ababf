//! Application core — run logic with no direct I/O.
//!
//! This module holds the rules of a collection run: run-label resolution,
//! the telemetry session and its envelopes, progress rendering, and the
//! session context that owns every acquired resource.  Hardware and
//! network access go through the **port traits** in [`ports`], so the
//! whole run can be driven by mocks on the host.

pub mod context;
pub mod ports;
pub mod progress;
pub mod run_config;
pub mod telemetry;
