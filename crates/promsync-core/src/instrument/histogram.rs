//! Sample-window histogram.
//!
//! Statistics (other than `count`) are computed over the most recent
//! [`DEFAULT_SAMPLE_SIZE`] values.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use super::{lock, Instrument, InstrumentKind, Snapshot};

pub const DEFAULT_SAMPLE_SIZE: usize = 1028;

/// Quantiles reported by [`Histogram::stats`].
pub const DEFAULT_PERCENTILES: [f64; 5] = [0.5, 0.75, 0.95, 0.99, 0.999];

/// Read-only statistics of a histogram.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistogramSnapshot {
    /// Total number of updates, including values evicted from the window.
    pub count: i64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub stddev: f64,
    /// `(quantile, value)` pairs in [`DEFAULT_PERCENTILES`] order.
    pub percentiles: Vec<(f64, f64)>,
}

#[derive(Debug)]
pub struct Histogram {
    count: AtomicI64,
    capacity: usize,
    window: Mutex<VecDeque<i64>>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SAMPLE_SIZE)
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            count: AtomicI64::new(0),
            capacity,
            window: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn update(&self, v: i64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut window = lock(&self.window);
        if window.len() == self.capacity {
            window.pop_front();
        }
        window.push_back(v);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        let mut window = lock(&self.window);
        window.clear();
        self.count.store(0, Ordering::Relaxed);
    }

    /// Values at the requested quantiles (0.0..=1.0).
    pub fn percentiles(&self, qs: &[f64]) -> Vec<f64> {
        let sorted = self.sorted_window();
        qs.iter().map(|&q| percentile(&sorted, q)).collect()
    }

    pub fn stats(&self) -> HistogramSnapshot {
        let count = self.count();
        let sorted = self.sorted_window();
        if sorted.is_empty() {
            return HistogramSnapshot {
                count,
                percentiles: DEFAULT_PERCENTILES.iter().map(|&q| (q, 0.0)).collect(),
                ..Default::default()
            };
        }

        let n = sorted.len() as f64;
        let mean = sorted.iter().map(|&v| v as f64).sum::<f64>() / n;
        let variance = sorted
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        HistogramSnapshot {
            count,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            stddev: variance.sqrt(),
            percentiles: DEFAULT_PERCENTILES
                .iter()
                .map(|&q| (q, percentile(&sorted, q)))
                .collect(),
        }
    }

    fn sorted_window(&self) -> Vec<i64> {
        let mut values: Vec<i64> = lock(&self.window).iter().copied().collect();
        values.sort_unstable();
        values
    }
}

/// Linear interpolation at rank `q * (n + 1)` over sorted values.
fn percentile(sorted: &[i64], q: f64) -> f64 {
    let Some(&first) = sorted.first() else { return 0.0; };
    let last = sorted[sorted.len() - 1];

    let pos = q * (sorted.len() as f64 + 1.0);
    if pos < 1.0 {
        return first as f64;
    }
    if pos >= sorted.len() as f64 {
        return last as f64;
    }
    let lower = sorted[pos as usize - 1] as f64;
    let upper = sorted[pos as usize] as f64;
    lower + (pos - pos.floor()) * (upper - lower)
}

impl Instrument for Histogram {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Histogram
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::Histogram(self.stats())
    }
}
