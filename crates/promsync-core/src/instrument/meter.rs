//! Throughput meter with exponentially weighted moving averages.
//!
//! Rates are ticked every [`TICK`] like a classic 1/5/15-minute load average.
//! There is no background ticker: elapsed ticks are replayed lazily whenever the
//! meter is marked or read.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{lock, Instrument, InstrumentKind, Snapshot};

const TICK: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    init: bool,
}

impl Ewma {
    fn new(minutes: f64) -> Self {
        Self {
            alpha: 1.0 - (-TICK.as_secs_f64() / 60.0 / minutes).exp(),
            rate: 0.0,
            init: false,
        }
    }

    fn tick(&mut self, uncounted: i64) {
        let instant = uncounted as f64 / TICK.as_secs_f64();
        if self.init {
            self.rate += self.alpha * (instant - self.rate);
        } else {
            self.rate = instant;
            self.init = true;
        }
    }

    /// Apply `n` ticks that saw no events.
    fn decay(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        if !self.init {
            self.rate = 0.0;
            self.init = true;
            return;
        }
        self.rate *= (1.0 - self.alpha).powf(n as f64);
    }
}

#[derive(Debug)]
struct MeterState {
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    uncounted: i64,
    last_tick: Instant,
}

impl MeterState {
    fn advance(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = (elapsed.as_nanos() / TICK.as_nanos()) as u64;
        if ticks == 0 {
            return;
        }
        self.last_tick += TICK * ticks.min(u32::MAX as u64) as u32;

        let uncounted = std::mem::take(&mut self.uncounted);
        for ewma in [&mut self.m1, &mut self.m5, &mut self.m15] {
            ewma.tick(uncounted);
            ewma.decay(ticks - 1);
        }
    }
}

/// Read-only copy of a meter's count and rates (events per second).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

/// Counts events and tracks their rate.
#[derive(Debug)]
pub struct Meter {
    count: AtomicI64,
    start: Instant,
    state: Mutex<MeterState>,
}

impl Default for Meter {
    fn default() -> Self {
        Self::starting_at(Instant::now())
    }
}

impl Meter {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn starting_at(start: Instant) -> Self {
        Self {
            count: AtomicI64::new(0),
            start,
            state: Mutex::new(MeterState {
                m1: Ewma::new(1.0),
                m5: Ewma::new(5.0),
                m15: Ewma::new(15.0),
                uncounted: 0,
                last_tick: start,
            }),
        }
    }

    /// Record `n` events.
    pub fn mark(&self, n: i64) {
        self.mark_at(n, Instant::now());
    }

    pub(crate) fn mark_at(&self, n: i64, now: Instant) {
        self.count.fetch_add(n, Ordering::Relaxed);
        let mut state = lock(&self.state);
        state.advance(now);
        state.uncounted += n;
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn rates(&self) -> MeterSnapshot {
        self.rates_at(Instant::now())
    }

    pub(crate) fn rates_at(&self, now: Instant) -> MeterSnapshot {
        let count = self.count();
        let mut state = lock(&self.state);
        state.advance(now);

        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let rate_mean = if elapsed > 0.0 { count as f64 / elapsed } else { 0.0 };

        MeterSnapshot {
            count,
            rate1: state.m1.rate,
            rate5: state.m5.rate,
            rate15: state.m15.rate,
            rate_mean,
        }
    }
}

impl Instrument for Meter {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Meter
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::Meter(self.rates())
    }
}
