//! Shared state for the exporter process.

use std::sync::Arc;

use tagmetrics_core::error::Result;
use tagmetrics_core::Reporter;

use crate::config::ExporterConfig;
use crate::prometheus::PrometheusReporter;
use crate::statsd::StatsdReporter;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    prometheus: Arc<PrometheusReporter>,
    reporters: Vec<Arc<dyn Reporter>>,
}

impl AppState {
    /// Build reporters from config. Must run inside a tokio runtime when a
    /// batched statsd pipeline is configured.
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        let prometheus = Arc::new(PrometheusReporter::new(cfg.prometheus.clone())?);

        let mut reporters: Vec<Arc<dyn Reporter>> = vec![prometheus.clone() as Arc<dyn Reporter>];
        if let Some(statsd) = &cfg.statsd {
            reporters.push(Arc::new(StatsdReporter::new(statsd)?));
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                prometheus,
                reporters,
            }),
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn prometheus(&self) -> Arc<PrometheusReporter> {
        Arc::clone(&self.inner.prometheus)
    }

    /// Every configured reporter, Prometheus first.
    pub fn reporters(&self) -> &[Arc<dyn Reporter>] {
        &self.inner.reporters
    }

    /// Flush and stop push pipelines.
    pub fn close(&self) {
        for r in &self.inner.reporters {
            r.close();
        }
    }
}
