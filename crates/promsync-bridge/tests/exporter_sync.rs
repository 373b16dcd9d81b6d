//! Single-pass behaviour of the exporter.

use std::sync::Arc;
use std::time::Duration;

use prometheus::proto::MetricType;
use promsync_bridge::render_text;
use promsync_core::{Instrument, InstrumentKind, Metric, Registry, Snapshot};

mod common;
use common::{family, kind, setup, value};

const SECOND: Duration = Duration::from_secs(1);

#[test]
fn counter_exported_with_cumulative_total() {
    let (source, exporter) = setup(SECOND);
    let counter = source.counter("counter").unwrap();
    counter.inc(2);
    counter.inc(13);

    let report = exporter.sync_once();
    assert_eq!(report.instruments, 1);
    assert_eq!(report.registered, 1);
    assert_eq!(report.failed, 0);

    let mf = family(exporter.target(), "test_subsys_counter").expect("exported");
    assert_eq!(mf.get_help(), "counter");
    assert_eq!(mf.get_field_type(), MetricType::COUNTER);
    assert_eq!(mf.get_metric()[0].get_counter().get_value(), 15.0);
    assert_eq!(exporter.target().gather().len(), 1);
}

#[test]
fn gauge_exported_with_last_value() {
    let (source, exporter) = setup(SECOND);
    let gauge = source.gauge("gauge").unwrap();
    gauge.update(2);
    gauge.update(13);

    exporter.sync_once();

    let mf = family(exporter.target(), "test_subsys_gauge").expect("exported");
    assert_eq!(mf.get_help(), "gauge");
    assert_eq!(mf.get_field_type(), MetricType::GAUGE);
    assert_eq!(mf.get_metric()[0].get_gauge().get_value(), 13.0);
}

#[test]
fn float_gauge_exported() {
    let (source, exporter) = setup(SECOND);
    source.gauge_f64("load.avg-1m").unwrap().update(0.75);

    exporter.sync_once();
    assert_eq!(value(exporter.target(), "test_subsys_load_avg_1m"), Some(0.75));
}

#[test]
fn repeated_passes_are_idempotent() {
    let (source, exporter) = setup(SECOND);
    source.counter("c").unwrap().inc(7);
    source.gauge("g").unwrap().update(-3);

    let first = exporter.sync_once();
    let before = render_text(exporter.target()).unwrap();
    let second = exporter.sync_once();
    let after = render_text(exporter.target()).unwrap();

    assert_eq!(before, after);
    assert_eq!(first.updated, second.updated);
    assert_eq!(first.registered, 2);
    assert_eq!(second.registered, 0);
    assert_eq!(value(exporter.target(), "test_subsys_c"), Some(7.0));
}

#[test]
fn counter_follows_total_not_deltas() {
    let (source, exporter) = setup(SECOND);
    let c = source.counter("jobs").unwrap();

    c.inc(5);
    exporter.sync_once();
    c.inc(1);
    c.inc(4);
    exporter.sync_once();
    assert_eq!(value(exporter.target(), "test_subsys_jobs"), Some(10.0));

    c.clear();
    c.inc(3);
    exporter.sync_once();
    assert_eq!(value(exporter.target(), "test_subsys_jobs"), Some(3.0));
}

#[test]
fn registered_name_cannot_be_claimed_again() {
    let (source, exporter) = setup(SECOND);
    source.counter("counter").unwrap();
    exporter.sync_once();

    let gauge = prometheus::Gauge::with_opts(
        prometheus::Opts::new("counter", "counter").namespace("test").subsystem("subsys"),
    )
    .unwrap();
    assert!(exporter.target().register(Box::new(gauge)).is_err());
}

#[test]
fn pre_registered_name_is_left_alone_and_retried() {
    let (source, exporter) = setup(SECOND);
    let foreign = prometheus::Gauge::new("test_subsys_counter", "pre-existing").unwrap();
    foreign.set(7.0);
    exporter.target().register(Box::new(foreign.clone())).unwrap();
    source.counter("counter").unwrap().inc(15);

    let report = exporter.sync_once();
    assert_eq!(report.failed, 1);
    assert_eq!(report.registered, 0);

    let mf = family(exporter.target(), "test_subsys_counter").unwrap();
    assert_eq!(mf.get_help(), "pre-existing");
    assert_eq!(mf.get_field_type(), MetricType::GAUGE);
    assert_eq!(mf.get_metric()[0].get_gauge().get_value(), 7.0);
    assert!(exporter.exported_names().is_empty());

    exporter.target().unregister(Box::new(foreign)).unwrap();
    let report = exporter.sync_once();
    assert_eq!(report.failed, 0);
    assert_eq!(report.registered, 1);
    assert_eq!(kind(exporter.target(), "test_subsys_counter"), Some(MetricType::COUNTER));
    assert_eq!(value(exporter.target(), "test_subsys_counter"), Some(15.0));
}

#[test]
fn one_bad_instrument_does_not_stop_the_pass() {
    let (source, exporter) = setup(SECOND);
    exporter
        .target()
        .register(Box::new(prometheus::Gauge::new("test_subsys_b", "taken").unwrap()))
        .unwrap();
    source.counter("a").unwrap().inc(1);
    source.counter("b").unwrap().inc(2);
    source.counter("c").unwrap().inc(3);

    let report = exporter.sync_once();
    assert_eq!(report.instruments, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(value(exporter.target(), "test_subsys_a"), Some(1.0));
    assert_eq!(value(exporter.target(), "test_subsys_c"), Some(3.0));
}

#[test]
fn sanitized_collision_keeps_first_owner() {
    let (source, exporter) = setup(SECOND);
    source.gauge("a-b").unwrap().update(1);
    source.counter("a.b").unwrap().inc(9);

    let report = exporter.sync_once();
    assert_eq!(report.registered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(kind(exporter.target(), "test_subsys_a_b"), Some(MetricType::GAUGE));
    assert_eq!(value(exporter.target(), "test_subsys_a_b"), Some(1.0));
}

#[test]
fn instrument_changing_kind_is_skipped() {
    let (source, exporter) = setup(SECOND);
    source.counter("x").unwrap().inc(4);
    exporter.sync_once();

    source.unregister("x");
    source.gauge("x").unwrap().update(100);
    let report = exporter.sync_once();
    assert_eq!(report.failed, 1);
    assert_eq!(kind(exporter.target(), "test_subsys_x"), Some(MetricType::COUNTER));
    assert_eq!(value(exporter.target(), "test_subsys_x"), Some(4.0));
}

struct Health;

impl Instrument for Health {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Opaque
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::Opaque
    }
}

#[test]
fn opaque_instruments_are_skipped() {
    let (source, exporter) = setup(SECOND);
    source.register("db.health", Metric::Custom(Arc::new(Health))).unwrap();
    source.gauge("g").unwrap().update(1);

    let report = exporter.sync_once();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(exporter.exported_names(), vec!["test_subsys_g".to_string()]);
}

#[test]
fn meter_exported_as_gauge_family() {
    let (source, exporter) = setup(SECOND);
    source.meter("requests").unwrap().mark(3);

    let report = exporter.sync_once();
    assert_eq!(report.registered, 5);
    assert_eq!(value(exporter.target(), "test_subsys_requests_count"), Some(3.0));
    for suffix in ["rate1", "rate5", "rate15", "rate_mean"] {
        let name = format!("test_subsys_requests_{suffix}");
        assert_eq!(kind(exporter.target(), &name), Some(MetricType::GAUGE), "{name}");
    }
    let mf = family(exporter.target(), "test_subsys_requests_rate1").unwrap();
    assert_eq!(mf.get_help(), "requests rate1");
}

#[test]
fn histogram_exported_as_gauge_family() {
    let (source, exporter) = setup(SECOND);
    let h = source.histogram("latency").unwrap();
    for v in 1..=100 {
        h.update(v);
    }

    let report = exporter.sync_once();
    assert_eq!(report.registered, 10);
    let t = exporter.target();
    assert_eq!(value(t, "test_subsys_latency_count"), Some(100.0));
    assert_eq!(value(t, "test_subsys_latency_min"), Some(1.0));
    assert_eq!(value(t, "test_subsys_latency_max"), Some(100.0));
    assert_eq!(value(t, "test_subsys_latency_mean"), Some(50.5));
    assert_eq!(value(t, "test_subsys_latency_p50"), Some(50.5));
    assert_eq!(value(t, "test_subsys_latency_p999"), Some(100.0));
}

#[test]
fn timer_exported_as_gauge_family() {
    let (source, exporter) = setup(SECOND);
    source.timer("db.query").unwrap().update(Duration::from_millis(3));

    let report = exporter.sync_once();
    assert_eq!(report.registered, 14);
    let t = exporter.target();
    assert_eq!(value(t, "test_subsys_db_query_count"), Some(1.0));
    assert_eq!(value(t, "test_subsys_db_query_max"), Some(3_000_000.0));
    assert!(value(t, "test_subsys_db_query_p99").is_some());
    assert!(value(t, "test_subsys_db_query_rate_mean").is_some());
}

#[test]
fn concurrent_passes_register_each_name_once() {
    let (source, exporter) = setup(SECOND);
    for i in 0..16 {
        source.counter(&format!("c{i}")).unwrap().inc(i);
    }

    let registered: usize = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    (0..20)
                        .map(|_| {
                            let r = exporter.sync_once();
                            assert_eq!(r.failed, 0);
                            r.registered
                        })
                        .sum::<usize>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(registered, 16);
    assert_eq!(exporter.exported_names().len(), 16);
    assert_eq!(value(exporter.target(), "test_subsys_c15"), Some(15.0));
}

#[test]
fn concurrent_passes_never_overshoot_counter_total() {
    const THREADS: usize = 8;
    const TRIALS: usize = 2000;

    let (source, exporter) = setup(SECOND);
    let counter = source.counter("jobs").unwrap();

    for trial in 0..TRIALS {
        counter.inc(15);
        if trial == 0 {
            exporter.sync_once();
        }
        counter.inc(15);

        let barrier = std::sync::Barrier::new(THREADS);
        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    exporter.sync_once();
                });
            }
        });

        assert_eq!(
            value(exporter.target(), "test_subsys_jobs"),
            Some(counter.count() as f64),
            "trial={trial}"
        );
    }
}

#[test]
fn self_metrics_are_exported_on_following_pass() {
    let source = Arc::new(Registry::new());
    let exporter = promsync_bridge::Exporter::new(
        source.clone(),
        "test",
        "subsys",
        prometheus::Registry::new(),
        SECOND,
    )
    .unwrap()
    .with_self_metrics(&source)
    .unwrap();

    exporter.sync_once();
    exporter.sync_once();
    assert_eq!(value(exporter.target(), "test_subsys_promsync_sync_passes"), Some(1.0));
    assert_eq!(value(exporter.target(), "test_subsys_promsync_sync_failures"), Some(0.0));
    assert_eq!(value(exporter.target(), "test_subsys_promsync_sync_duration_count"), Some(1.0));
}

#[test]
fn text_exposition_contains_exported_counter() {
    let (source, exporter) = setup(SECOND);
    source.counter("counter").unwrap().inc(15);
    exporter.sync_once();

    let text = render_text(exporter.target()).unwrap();
    assert!(text.contains("# HELP test_subsys_counter counter"));
    assert!(text.contains("# TYPE test_subsys_counter counter"));
    assert!(text.contains("test_subsys_counter 15"));
}

#[test]
fn empty_namespace_and_subsystem() {
    let source = Arc::new(Registry::new());
    let exporter = promsync_bridge::Exporter::new(
        source.clone(),
        "",
        "",
        prometheus::Registry::new(),
        SECOND,
    )
    .unwrap();
    source.gauge("queue.depth").unwrap().update(4);

    exporter.sync_once();
    assert_eq!(value(exporter.target(), "queue_depth"), Some(4.0));
}
