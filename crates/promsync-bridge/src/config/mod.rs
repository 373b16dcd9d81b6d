//! Bridge configuration: strict YAML, validated on load.

pub mod schema;

use std::fs;
use std::path::Path;

use promsync_core::error::{PromSyncError, Result};

pub use schema::{BridgeConfig, BridgeSection};

/// Read and validate a config file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<BridgeConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|e| {
        PromSyncError::Config(format!("cannot read {}: {e}", path.display()))
    })?;
    load_from_str(&raw).map_err(|e| match e {
        PromSyncError::Config(msg) => PromSyncError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Parse and validate config text. Unknown keys are rejected.
pub fn load_from_str(raw: &str) -> Result<BridgeConfig> {
    let cfg: BridgeConfig =
        serde_yaml::from_str(raw).map_err(|e| PromSyncError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
