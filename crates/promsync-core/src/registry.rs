//! Source registry: name -> instrument.
//!
//! Backed by `DashMap` so application threads can register and look up
//! instruments while the bridge enumerates them.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{PromSyncError, Result};
use crate::instrument::{
    Counter, Gauge, GaugeF64, Histogram, Instrument, InstrumentKind, Meter, Snapshot, Timer,
};

/// A registered instrument, tagged by kind.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeF64(Arc<GaugeF64>),
    Meter(Arc<Meter>),
    Histogram(Arc<Histogram>),
    Timer(Arc<Timer>),
    /// Any other instrument; exported only if its snapshot is numeric.
    Custom(Arc<dyn Instrument>),
}

impl Metric {
    fn as_instrument(&self) -> &dyn Instrument {
        match self {
            Metric::Counter(m) => m.as_ref(),
            Metric::Gauge(m) => m.as_ref(),
            Metric::GaugeF64(m) => m.as_ref(),
            Metric::Meter(m) => m.as_ref(),
            Metric::Histogram(m) => m.as_ref(),
            Metric::Timer(m) => m.as_ref(),
            Metric::Custom(m) => m.as_ref(),
        }
    }
}

impl Instrument for Metric {
    fn kind(&self) -> InstrumentKind {
        self.as_instrument().kind()
    }

    fn snapshot(&self) -> Snapshot {
        self.as_instrument().snapshot()
    }
}

/// One instrument's reading, tagged with its registered name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSnapshot {
    pub name: String,
    pub snapshot: Snapshot,
}

/// Anything the bridge can read instruments from.
pub trait Source: Send + Sync {
    /// Every current instrument, sorted by name.
    fn snapshot_all(&self) -> Vec<NamedSnapshot>;
}

#[derive(Default)]
pub struct Registry {
    instruments: DashMap<String, Metric>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            instruments: DashMap::new(),
        }
    }

    /// Register `metric` under `name`. Fails if the name is taken.
    pub fn register(&self, name: &str, metric: Metric) -> Result<()> {
        validate_name(name)?;
        match self.instruments.entry(name.to_string()) {
            Entry::Occupied(_) => Err(PromSyncError::Duplicate(name.to_string())),
            Entry::Vacant(v) => {
                tracing::debug!(instrument = name, kind = %metric.kind(), "instrument registered");
                v.insert(metric);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.instruments.get(name).map(|r| r.value().clone())
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.instruments.remove(name).map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instruments.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn counter(&self, name: &str) -> Result<Arc<Counter>> {
        match self.get_or_insert(name, || Metric::Counter(Arc::default()))? {
            Metric::Counter(c) => Ok(c),
            other => Err(mismatch(name, &other, InstrumentKind::Counter)),
        }
    }

    pub fn gauge(&self, name: &str) -> Result<Arc<Gauge>> {
        match self.get_or_insert(name, || Metric::Gauge(Arc::default()))? {
            Metric::Gauge(g) => Ok(g),
            other => Err(mismatch(name, &other, InstrumentKind::Gauge)),
        }
    }

    pub fn gauge_f64(&self, name: &str) -> Result<Arc<GaugeF64>> {
        match self.get_or_insert(name, || Metric::GaugeF64(Arc::default()))? {
            Metric::GaugeF64(g) => Ok(g),
            other => Err(mismatch(name, &other, InstrumentKind::GaugeF64)),
        }
    }

    pub fn meter(&self, name: &str) -> Result<Arc<Meter>> {
        match self.get_or_insert(name, || Metric::Meter(Arc::default()))? {
            Metric::Meter(m) => Ok(m),
            other => Err(mismatch(name, &other, InstrumentKind::Meter)),
        }
    }

    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>> {
        match self.get_or_insert(name, || Metric::Histogram(Arc::default()))? {
            Metric::Histogram(h) => Ok(h),
            other => Err(mismatch(name, &other, InstrumentKind::Histogram)),
        }
    }

    pub fn timer(&self, name: &str) -> Result<Arc<Timer>> {
        match self.get_or_insert(name, || Metric::Timer(Arc::default()))? {
            Metric::Timer(t) => Ok(t),
            other => Err(mismatch(name, &other, InstrumentKind::Timer)),
        }
    }

    fn get_or_insert(&self, name: &str, make: impl FnOnce() -> Metric) -> Result<Metric> {
        validate_name(name)?;
        Ok(self
            .instruments
            .entry(name.to_string())
            .or_insert_with(make)
            .value()
            .clone())
    }
}

impl Source for Registry {
    fn snapshot_all(&self) -> Vec<NamedSnapshot> {
        // Clone out first so no shard lock is held while instruments are read.
        let entries: Vec<(String, Metric)> = self
            .instruments
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut out: Vec<NamedSnapshot> = entries
            .into_iter()
            .map(|(name, metric)| NamedSnapshot {
                snapshot: metric.snapshot(),
                name,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PromSyncError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn mismatch(name: &str, found: &Metric, requested: InstrumentKind) -> PromSyncError {
    PromSyncError::KindMismatch {
        name: name.to_string(),
        registered: found.kind(),
        requested,
    }
}
