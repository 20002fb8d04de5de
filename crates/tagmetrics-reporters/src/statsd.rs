//! Push reporter emitting DogStatsD lines over the batched UDP transport.
//!
//! Line format: `<prefix><key>:<value>|<type>[|#tag:value,...]` with `h` for
//! observations, `g` for gauges and `c` for counters. Tags are written in
//! sorted name order.

use std::fmt::Write;
use std::sync::Arc;

use tagmetrics_core::error::{Result, TagMetricsError};
use tagmetrics_core::{Reporter, Tags};

use crate::config::StatsdConfig;
use crate::network::{SendCallback, UdpTransport};

/// Receives transport failures for lines sent by this reporter.
pub type ErrorCallback = Arc<dyn Fn(&TagMetricsError) + Send + Sync>;

pub struct StatsdReporter {
    prefix: String,
    transport: UdpTransport,
    errback: Option<ErrorCallback>,
}

impl StatsdReporter {
    pub fn new(cfg: &StatsdConfig) -> Result<Self> {
        Ok(Self::with_transport(cfg.prefix.clone(), UdpTransport::new(&cfg.socket)?))
    }

    pub fn with_transport(prefix: impl Into<String>, transport: UdpTransport) -> Self {
        Self {
            prefix: prefix.into(),
            transport,
            errback: None,
        }
    }

    pub fn with_errback(mut self, errback: ErrorCallback) -> Self {
        self.errback = Some(errback);
        self
    }

    /// Format one measurement.
    pub fn format_line(&self, key: &str, value: f64, kind: &str, tags: &Tags) -> String {
        let mut line = format!("{}{}:{}|{}", self.prefix, key, value, kind);
        if !tags.is_empty() {
            line.push_str("|#");
            for (i, (k, v)) in tags.iter().enumerate() {
                if i > 0 {
                    line.push(',');
                }
                let _ = write!(line, "{k}:{v}");
            }
        }
        line
    }

    fn send(&self, key: &str, value: f64, kind: &str, tags: &Tags) {
        let line = self.format_line(key, value, kind, tags);
        let callback = self.errback.clone().map(|eb| -> SendCallback {
            Box::new(move |res: Result<()>| {
                if let Err(e) = res {
                    eb(&e);
                }
            })
        });
        if let Err(e) = self.transport.send(line, callback) {
            tracing::debug!(key, error = %e, "statsd line rejected");
        }
    }
}

impl Reporter for StatsdReporter {
    fn report(&self, key: &str, value: f64, tags: &Tags) {
        self.send(key, value, "h", tags);
    }

    fn value(&self, key: &str, value: f64, tags: &Tags) {
        self.send(key, value, "g", tags);
    }

    fn increment(&self, key: &str, value: f64, tags: &Tags) {
        self.send(key, value, "c", tags);
    }

    fn close(&self) {
        self.transport.close();
    }
}
