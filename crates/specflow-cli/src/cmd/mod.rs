pub mod advance;
pub mod init;
pub mod start;
pub mod status;
pub mod task;
pub mod validate;

use anyhow::Context;
use specflow_core::config::{Config, WarnLevel};
use std::path::Path;

/// Load `.specflow/config.yaml`, surfacing config problems as log lines.
pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    let config = Config::load(root).context("failed to load config")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Error => tracing::error!("config: {}", w.message),
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
        }
    }
    Ok(config)
}
