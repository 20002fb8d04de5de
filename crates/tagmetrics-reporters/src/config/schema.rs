use std::net::SocketAddr;

use serde::Deserialize;
use tagmetrics_core::error::{Result, TagMetricsError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub prometheus: PrometheusConfig,

    #[serde(default)]
    pub statsd: Option<StatsdConfig>,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TagMetricsError::InvalidConfig(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.prometheus.validate()?;
        if let Some(statsd) = &self.statsd {
            statsd.socket.validate()?;
        }

        Ok(())
    }
}

/// Aggregation settings. Limits are independent of each other; a hard limit
/// below the soft limit is legal.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_soft_limit")]
    pub soft_limit: usize,

    #[serde(default = "default_hard_limit")]
    pub hard_limit: usize,

    #[serde(default = "default_warn_at")]
    pub warn_at: usize,

    #[serde(default = "default_buckets")]
    pub buckets: Vec<f64>,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            prefix: String::new(),
            soft_limit: default_soft_limit(),
            hard_limit: default_hard_limit(),
            warn_at: default_warn_at(),
            buckets: default_buckets(),
        }
    }
}

impl PrometheusConfig {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<SocketAddr>().is_err() {
            return Err(TagMetricsError::InvalidConfig(format!(
                "prometheus.listen must be a valid socket address: {}",
                self.listen
            )));
        }
        if self.soft_limit == 0 || self.hard_limit == 0 || self.warn_at == 0 {
            return Err(TagMetricsError::InvalidConfig(
                "prometheus limits must be at least 1".into(),
            ));
        }
        if self.buckets.iter().any(|b| !b.is_finite()) {
            return Err(TagMetricsError::InvalidConfig(
                "prometheus.buckets must be finite".into(),
            ));
        }
        if self.buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TagMetricsError::InvalidConfig(
                "prometheus.buckets must be strictly ascending".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:9464".into()
}
fn default_soft_limit() -> usize {
    5000
}
fn default_hard_limit() -> usize {
    10000
}
fn default_warn_at() -> usize {
    4000
}
fn default_buckets() -> Vec<f64> {
    vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsdConfig {
    #[serde(default)]
    pub prefix: String,

    pub socket: SocketConfig,
}

/// Datagram transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocketConfig {
    pub host: String,

    pub port: u16,

    #[serde(default = "default_batch")]
    pub batch: bool,

    /// Flush once buffered bytes exceed this.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl SocketConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            batch: default_batch(),
            max_buffer_size: default_max_buffer_size(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TagMetricsError::InvalidConfig("socket.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(TagMetricsError::InvalidConfig("socket.port must not be 0".into()));
        }
        if self.max_buffer_size == 0 {
            return Err(TagMetricsError::InvalidConfig(
                "socket.max_buffer_size must be at least 1".into(),
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(TagMetricsError::InvalidConfig(
                "socket.flush_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_batch() -> bool {
    true
}
fn default_max_buffer_size() -> usize {
    1000
}
fn default_flush_interval_ms() -> u64 {
    1000
}
