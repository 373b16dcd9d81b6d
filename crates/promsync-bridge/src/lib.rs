//! promsync bridge library entry.
//!
//! Copies instruments from a [`promsync_core::Source`] into a
//! `prometheus::Registry` on a fixed interval. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod config;
pub mod exported;
pub mod exporter;

pub use exported::{Exported, ExportedKind};
pub use exporter::{render_text, Exporter, ExporterHandle, SyncReport};
