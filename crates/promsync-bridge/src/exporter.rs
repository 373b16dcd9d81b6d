//! Exporter: keeps a Prometheus registry in step with a source registry.
//!
//! Every pass walks all source instruments, resolves (or registers on first
//! sight) the matching exported metric and writes the current value into it.
//!
//! - Counters are set to the cumulative count, so passes are idempotent.
//! - Meters, histograms and timers become a family of gauges sharing the
//!   instrument's exported name as prefix (`_count`, `_rate1`, `_p99`, ...).
//! - Registration failures are logged and retried on the next pass; only
//!   successful registrations are cached.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use promsync_core::error::{PromSyncError, Result};
use promsync_core::naming::{fq_name, percentile_suffix, with_suffix};
use promsync_core::{
    Counter, HistogramSnapshot, MeterSnapshot, NamedSnapshot, Registry as SourceRegistry,
    Snapshot, Source, Timer,
};

use crate::config::BridgeConfig;
use crate::exported::{Exported, ExportedKind};

/// Outcome of one sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Source instruments seen.
    pub instruments: usize,
    /// Exported metrics written.
    pub updated: usize,
    /// Exported metrics registered during this pass.
    pub registered: usize,
    /// Instruments with no numeric value.
    pub skipped: usize,
    /// Exported metrics that could not be resolved this pass.
    pub failed: usize,
}

struct CacheEntry {
    /// Source instrument name that owns the exported name.
    owner: String,
    metric: Exported,
}

/// Instruments the exporter records about its own passes.
struct SelfMetrics {
    passes: Arc<Counter>,
    failures: Arc<Counter>,
    duration: Arc<Timer>,
}

/// Bridges one [`Source`] into one Prometheus registry.
pub struct Exporter {
    source: Arc<dyn Source>,
    target: Registry,
    namespace: String,
    subsystem: String,
    interval: Duration,
    cache: DashMap<String, CacheEntry>,
    self_metrics: Option<SelfMetrics>,
}

impl Exporter {
    /// Store the collaborators. Neither registry is touched until a pass runs.
    pub fn new(
        source: Arc<dyn Source>,
        namespace: impl Into<String>,
        subsystem: impl Into<String>,
        target: Registry,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(PromSyncError::Config("sync interval must be greater than zero".into()));
        }
        Ok(Self {
            source,
            target,
            namespace: namespace.into(),
            subsystem: subsystem.into(),
            interval,
            cache: DashMap::new(),
            self_metrics: None,
        })
    }

    /// Same as [`Exporter::new`], with prefix and interval taken from `cfg`.
    pub fn from_config(source: Arc<dyn Source>, target: Registry, cfg: &BridgeConfig) -> Result<Self> {
        Self::new(
            source,
            cfg.bridge.namespace.clone(),
            cfg.bridge.subsystem.clone(),
            target,
            cfg.bridge.interval(),
        )
    }

    /// Record pass count, failures and pass duration into `registry`
    /// (`promsync.sync.passes`, `promsync.sync.failures`,
    /// `promsync.sync.duration`).
    pub fn with_self_metrics(mut self, registry: &SourceRegistry) -> Result<Self> {
        self.self_metrics = Some(SelfMetrics {
            passes: registry.counter("promsync.sync.passes")?,
            failures: registry.counter("promsync.sync.failures")?,
            duration: registry.timer("promsync.sync.duration")?,
        });
        Ok(self)
    }

    pub fn target(&self) -> &Registry {
        &self.target
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Exported names registered so far, sorted.
    pub fn exported_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Run exactly one best-effort pass over the source registry.
    pub fn sync_once(&self) -> SyncReport {
        let started = Instant::now();
        let mut report = SyncReport::default();

        for NamedSnapshot { name, snapshot } in self.source.snapshot_all() {
            report.instruments += 1;
            let fq = fq_name(&self.namespace, &self.subsystem, &name);

            match snapshot {
                Snapshot::Counter(v) => {
                    self.export(&name, &fq, &name, ExportedKind::Counter, v as f64, &mut report);
                }
                Snapshot::Gauge(v) => {
                    self.export(&name, &fq, &name, ExportedKind::Gauge, v as f64, &mut report);
                }
                Snapshot::GaugeF64(v) => {
                    self.export(&name, &fq, &name, ExportedKind::Gauge, v, &mut report);
                }
                Snapshot::Meter(m) => {
                    self.export_stats(&name, &fq, &meter_stats(&m, true), &mut report);
                }
                Snapshot::Histogram(h) => {
                    self.export_stats(&name, &fq, &histogram_stats(&h), &mut report);
                }
                Snapshot::Timer(t) => {
                    let mut stats = histogram_stats(&t.durations);
                    stats.extend(meter_stats(&t.rates, false));
                    self.export_stats(&name, &fq, &stats, &mut report);
                }
                Snapshot::Opaque => {
                    tracing::debug!(instrument = %name, "no numeric value; skipped");
                    report.skipped += 1;
                }
            }
        }

        if let Some(m) = &self.self_metrics {
            m.passes.inc(1);
            m.failures.inc(report.failed as i64);
            m.duration.update_since(started);
        }

        tracing::debug!(
            instruments = report.instruments,
            updated = report.updated,
            registered = report.registered,
            skipped = report.skipped,
            failed = report.failed,
            "sync pass complete"
        );
        report
    }

    /// Sync forever on the configured interval. The first pass runs immediately.
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Sync on the configured interval until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            namespace = %self.namespace,
            subsystem = %self.subsystem,
            interval_ms = self.interval.as_millis() as u64,
            "sync loop started"
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tick.tick() => {
                    self.sync_once();
                }
            }
        }
        tracing::info!("sync loop stopped");
    }

    /// Run the sync loop on a background task.
    ///
    /// Dropping the returned handle detaches the loop; call
    /// [`ExporterHandle::stop`] to end it.
    pub fn spawn(self: Arc<Self>) -> ExporterHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let stopped = async move {
                while stop_rx.changed().await.is_ok() {
                    if *stop_rx.borrow() {
                        return;
                    }
                }
                std::future::pending::<()>().await
            };
            self.run_until(stopped).await;
        });
        ExporterHandle { stop: stop_tx, task }
    }

    fn export_stats(&self, owner: &str, fq: &str, stats: &[(String, f64)], report: &mut SyncReport) {
        for (suffix, value) in stats {
            let name = with_suffix(fq, suffix);
            let help = format!("{owner} {suffix}");
            self.export(owner, &name, &help, ExportedKind::Gauge, *value, report);
        }
    }

    fn export(
        &self,
        owner: &str,
        fq: &str,
        help: &str,
        kind: ExportedKind,
        value: f64,
        report: &mut SyncReport,
    ) {
        match self.write(owner, fq, help, kind, value) {
            Ok(created) => {
                report.updated += 1;
                if created {
                    report.registered += 1;
                }
            }
            Err(e) => {
                tracing::warn!(instrument = %owner, metric = %fq, error = %e, "metric not synced this pass");
                report.failed += 1;
            }
        }
    }

    /// Write `value` into the cached handle for `fq`, registering one on
    /// first sight. Returns whether a handle was registered.
    ///
    /// The entry's shard stays locked across registration and the write, so
    /// concurrent passes register a name at most once and never interleave
    /// a counter's read-and-increment.
    fn write(&self, owner: &str, fq: &str, help: &str, kind: ExportedKind, value: f64) -> Result<bool> {
        match self.cache.entry(fq.to_string()) {
            Entry::Occupied(e) => {
                let entry = e.get();
                if entry.owner != owner {
                    return Err(PromSyncError::Registration {
                        name: fq.to_string(),
                        reason: format!("already exported for instrument {:?}", entry.owner),
                    });
                }
                if entry.metric.kind() != kind {
                    return Err(PromSyncError::Registration {
                        name: fq.to_string(),
                        reason: format!("already exported as {}, instrument is now a {kind}", entry.metric.kind()),
                    });
                }
                entry.metric.set(value);
                Ok(false)
            }
            Entry::Vacant(v) => {
                let metric = Exported::new(kind, fq, help)?;
                metric.set(value);
                metric
                    .register(&self.target)
                    .map_err(|e| PromSyncError::Registration {
                        name: fq.to_string(),
                        reason: e.to_string(),
                    })?;
                tracing::info!(instrument = %owner, metric = %fq, %kind, "exported metric registered");
                v.insert(CacheEntry {
                    owner: owner.to_string(),
                    metric,
                });
                Ok(true)
            }
        }
    }
}

/// Handle to a loop started with [`Exporter::spawn`].
pub struct ExporterHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ExporterHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "sync loop task ended abnormally");
        }
    }

    /// Whether the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn meter_stats(m: &MeterSnapshot, with_count: bool) -> Vec<(String, f64)> {
    let mut stats = Vec::with_capacity(5);
    if with_count {
        stats.push(("count".to_string(), m.count as f64));
    }
    stats.extend([
        ("rate1".to_string(), m.rate1),
        ("rate5".to_string(), m.rate5),
        ("rate15".to_string(), m.rate15),
        ("rate_mean".to_string(), m.rate_mean),
    ]);
    stats
}

fn histogram_stats(h: &HistogramSnapshot) -> Vec<(String, f64)> {
    let mut stats = vec![
        ("count".to_string(), h.count as f64),
        ("min".to_string(), h.min as f64),
        ("max".to_string(), h.max as f64),
        ("mean".to_string(), h.mean),
        ("stddev".to_string(), h.stddev),
    ];
    stats.extend(h.percentiles.iter().map(|&(q, v)| (percentile_suffix(q), v)));
    stats
}

/// Encode everything in `target` in the Prometheus text exposition format.
pub fn render_text(target: &Registry) -> Result<String> {
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&target.gather(), &mut buf)
        .map_err(|e| PromSyncError::Internal(format!("encode failed: {e}")))?;
    String::from_utf8(buf).map_err(|e| PromSyncError::Internal(format!("exposition is not utf-8: {e}")))
}
