use std::time::{Duration, Instant};

use super::{Histogram, HistogramSnapshot, Instrument, InstrumentKind, Meter, MeterSnapshot, Snapshot};

/// Durations (nanoseconds) and call rate of a timed operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimerSnapshot {
    pub durations: HistogramSnapshot,
    pub rates: MeterSnapshot,
}

/// Histogram of durations plus a meter of how often they were recorded.
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, d: Duration) {
        let nanos = i64::try_from(d.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f` and record how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.update_since(start);
        out
    }

    pub fn count(&self) -> i64 {
        self.histogram.count()
    }

    pub fn stats(&self) -> TimerSnapshot {
        TimerSnapshot {
            durations: self.histogram.stats(),
            rates: self.meter.rates(),
        }
    }
}

impl Instrument for Timer {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Timer
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::Timer(self.stats())
    }
}
