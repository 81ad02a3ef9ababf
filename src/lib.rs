//! Air-quality telemetry agent library.
//!
//! Exposes the run logic for integration testing.  Device and network
//! adapters are gated behind the `device` feature so the core builds and
//! tests on any host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod scheduler;
pub mod sensors;
