//! Handles registered with the target Prometheus registry.

use std::fmt;

use prometheus::{Counter, Gauge, Opts, Registry};
use promsync_core::error::{PromSyncError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportedKind {
    Counter,
    Gauge,
}

impl fmt::Display for ExportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportedKind::Counter => f.write_str("counter"),
            ExportedKind::Gauge => f.write_str("gauge"),
        }
    }
}

/// One exported metric. Cloning shares the underlying value.
#[derive(Clone)]
pub enum Exported {
    Counter(Counter),
    Gauge(Gauge),
}

impl Exported {
    /// Build an unregistered handle. `name` must already be fully qualified.
    pub fn new(kind: ExportedKind, name: &str, help: &str) -> Result<Self> {
        let opts = Opts::new(name, help);
        let built = match kind {
            ExportedKind::Counter => Counter::with_opts(opts).map(Exported::Counter),
            ExportedKind::Gauge => Gauge::with_opts(opts).map(Exported::Gauge),
        };
        built.map_err(|e| PromSyncError::Registration {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn kind(&self) -> ExportedKind {
        match self {
            Exported::Counter(_) => ExportedKind::Counter,
            Exported::Gauge(_) => ExportedKind::Gauge,
        }
    }

    /// Register a clone of this handle with `target`.
    pub fn register(&self, target: &Registry) -> prometheus::Result<()> {
        match self {
            Exported::Counter(c) => target.register(Box::new(c.clone())),
            Exported::Gauge(g) => target.register(Box::new(g.clone())),
        }
    }

    /// Make the exported value equal `value`.
    ///
    /// Counters only move forward, so a source total below the exported one
    /// (cleared or decremented) resets before re-adding. Negative totals
    /// export as 0.
    pub fn set(&self, value: f64) {
        match self {
            Exported::Gauge(g) => g.set(value),
            Exported::Counter(c) => {
                let target = if value.is_finite() { value.max(0.0) } else { 0.0 };
                let current = c.get();
                if target < current {
                    c.reset();
                    if target > 0.0 {
                        c.inc_by(target);
                    }
                } else if target > current {
                    c.inc_by(target - current);
                }
            }
        }
    }

    pub fn get(&self) -> f64 {
        match self {
            Exported::Counter(c) => c.get(),
            Exported::Gauge(g) => g.get(),
        }
    }
}
