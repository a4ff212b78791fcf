//! Daemon config loader (strict parsing).

pub mod schema;

use std::fs;

use metricq_core::error::{MetricError, Result};

pub use schema::{DaemonConfig, DaemonSection, MetricDecl};

pub fn load_from_file(path: &str) -> Result<DaemonConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<DaemonConfig> {
    let cfg: DaemonConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
