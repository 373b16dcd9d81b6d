//! Helpers shared by exporter tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use prometheus::proto::{MetricFamily, MetricType};
use promsync_bridge::Exporter;
use promsync_core::Registry;

pub fn setup(interval: Duration) -> (Arc<Registry>, Exporter) {
    let source = Arc::new(Registry::new());
    let exporter = Exporter::new(source.clone(), "test", "subsys", prometheus::Registry::new(), interval)
        .expect("valid exporter");
    (source, exporter)
}

pub fn family(target: &prometheus::Registry, name: &str) -> Option<MetricFamily> {
    target.gather().into_iter().find(|mf| mf.get_name() == name)
}

/// Value of a single-series counter or gauge family.
pub fn value(target: &prometheus::Registry, name: &str) -> Option<f64> {
    let mf = family(target, name)?;
    let m = mf.get_metric().first()?;
    match mf.get_field_type() {
        MetricType::COUNTER => Some(m.get_counter().get_value()),
        MetricType::GAUGE => Some(m.get_gauge().get_value()),
        _ => None,
    }
}

pub fn kind(target: &prometheus::Registry, name: &str) -> Option<MetricType> {
    family(target, name).map(|mf| mf.get_field_type())
}
