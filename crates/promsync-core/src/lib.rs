//! promsync core: in-process instruments, the source registry, name mapping and
//! the shared error type.
//!
//! This crate carries no runtime or exporter dependencies so application code
//! can record into a [`Registry`] without pulling in the Prometheus stack.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Lock poisoning is recovered from instead of propagated so a panicking
//! writer elsewhere never takes the bridge down with it.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod instrument;
pub mod naming;
pub mod registry;

/// Shared result type.
pub use error::{ErrorCode, PromSyncError, Result};
pub use instrument::{
    Counter, Gauge, GaugeF64, Histogram, HistogramSnapshot, Instrument, InstrumentKind, Meter,
    MeterSnapshot, Snapshot, Timer, TimerSnapshot,
};
pub use registry::{Metric, NamedSnapshot, Registry, Source};
