//! promsync bridge binary.
//!
//! - Loads `promsync.yaml` (or the path given as first argument)
//! - Syncs the process's own instruments into a Prometheus registry
//! - On Ctrl-C, stops the loop and prints the final text exposition

use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::{fmt, EnvFilter};

use promsync_bridge::{config, render_text, Exporter};
use promsync_core::{Registry, Result};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(code = e.code().as_str(), error = %e, "promsync-bridge failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "promsync.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let source = Arc::new(Registry::new());
    let uptime = source.gauge_f64("process.uptime_seconds")?;

    let exporter = Exporter::from_config(source.clone(), prometheus::Registry::new(), &cfg)?
        .with_self_metrics(&source)?;
    let exporter = Arc::new(exporter);
    let handle = Arc::clone(&exporter).spawn();

    tracing::info!(config = %path, "promsync-bridge running");

    let started = Instant::now();
    let mut tick = tokio::time::interval(cfg.bridge.interval());
    loop {
        tokio::select! {
            _ = tick.tick() => uptime.update(started.elapsed().as_secs_f64()),
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "ctrl-c handler failed; shutting down");
                }
                break;
            }
        }
    }

    handle.stop().await;
    exporter.sync_once();
    print!("{}", render_text(exporter.target())?);
    Ok(())
}
