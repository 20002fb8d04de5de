//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;

use tagmetrics_core::error::{Result, TagMetricsError};

pub use schema::{ExporterConfig, PrometheusConfig, SocketConfig, StatsdConfig};

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TagMetricsError::InvalidConfig(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| TagMetricsError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
