use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use super::{Instrument, InstrumentKind, Snapshot};

/// Integer gauge, last write wins.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Instrument for Gauge {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Gauge
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::Gauge(self.value())
    }
}

/// Floating point gauge stored as raw `f64` bits.
#[derive(Debug)]
pub struct GaugeF64 {
    bits: AtomicU64,
}

impl Default for GaugeF64 {
    fn default() -> Self {
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }
}

impl GaugeF64 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Instrument for GaugeF64 {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::GaugeF64
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::GaugeF64(self.value())
    }
}
