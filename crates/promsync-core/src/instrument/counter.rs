use std::sync::atomic::{AtomicI64, Ordering};

use super::{Instrument, InstrumentKind, Snapshot};

/// Cumulative integer count.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by an arbitrary value.
    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Decrement by an arbitrary value.
    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    /// Reset to zero.
    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Instrument for Counter {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Counter
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::Counter(self.count())
    }
}
