use std::time::Duration;

use serde::Deserialize;
use promsync_core::error::{PromSyncError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub version: u32,

    #[serde(default)]
    pub bridge: BridgeSection,
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PromSyncError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.bridge.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub subsystem: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            subsystem: String::new(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl BridgeSection {
    pub fn validate(&self) -> Result<()> {
        if !(10..=3_600_000).contains(&self.interval_ms) {
            return Err(PromSyncError::Config(
                "bridge.interval_ms must be between 10 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    1000
}
