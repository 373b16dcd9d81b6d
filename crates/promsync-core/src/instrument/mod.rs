//! In-process instruments.
//!
//! Every instrument is owned and mutated by application code; the bridge only
//! reads them through [`Instrument::snapshot`]. Values are held in atomics, or
//! behind a short `Mutex` section where several fields move together (meter
//! rates, histogram samples).

use std::fmt;
use std::sync::{Mutex, MutexGuard};

mod counter;
mod gauge;
mod histogram;
mod meter;
mod timer;

pub use counter::Counter;
pub use gauge::{Gauge, GaugeF64};
pub use histogram::{Histogram, HistogramSnapshot, DEFAULT_PERCENTILES, DEFAULT_SAMPLE_SIZE};
pub use meter::{Meter, MeterSnapshot};
pub use timer::{Timer, TimerSnapshot};

/// Closed set of instrument kinds understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Counter,
    Gauge,
    GaugeF64,
    Meter,
    Histogram,
    Timer,
    /// A user-defined instrument with no numeric representation.
    Opaque,
}

impl InstrumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::Gauge => "gauge",
            InstrumentKind::GaugeF64 => "gauge_f64",
            InstrumentKind::Meter => "meter",
            InstrumentKind::Histogram => "histogram",
            InstrumentKind::Timer => "timer",
            InstrumentKind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time reading of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Counter(i64),
    Gauge(i64),
    GaugeF64(f64),
    Meter(MeterSnapshot),
    Histogram(HistogramSnapshot),
    Timer(TimerSnapshot),
    Opaque,
}

impl Snapshot {
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Snapshot::Counter(_) => InstrumentKind::Counter,
            Snapshot::Gauge(_) => InstrumentKind::Gauge,
            Snapshot::GaugeF64(_) => InstrumentKind::GaugeF64,
            Snapshot::Meter(_) => InstrumentKind::Meter,
            Snapshot::Histogram(_) => InstrumentKind::Histogram,
            Snapshot::Timer(_) => InstrumentKind::Timer,
            Snapshot::Opaque => InstrumentKind::Opaque,
        }
    }
}

/// Capability every registered instrument exposes to readers.
pub trait Instrument: Send + Sync {
    fn kind(&self) -> InstrumentKind;
    fn snapshot(&self) -> Snapshot;
}

/// Lock a mutex, recovering the guard if a writer panicked while holding it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
