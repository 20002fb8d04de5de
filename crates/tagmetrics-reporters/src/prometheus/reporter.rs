use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Map, Value};
use tagmetrics_core::error::Result;
use tagmetrics_core::event::{LogCallback, LogEvent, LogEventCode, LogLevel};
use tagmetrics_core::labels::canonicalize;
use tagmetrics_core::{Reporter, Tags};

use super::render::render;
use super::store::{Admission, Limits, Measurement, MetricStore};
use crate::config::PrometheusConfig;

const REPORTER_NAME: &str = "PrometheusReporter";

/// Pull-based reporter: aggregates in memory, rendered on scrape.
///
/// One mutex guards the store and is held across a single write or a single
/// render. Diagnostic events are emitted after the lock is released, so a
/// callback may record into this reporter.
pub struct PrometheusReporter {
    prefix: String,
    store: Mutex<MetricStore>,
    log_callback: Option<LogCallback>,
}

impl PrometheusReporter {
    pub fn new(cfg: PrometheusConfig) -> Result<Self> {
        cfg.validate()?;
        let limits = Limits {
            warn_at: cfg.warn_at,
            soft_limit: cfg.soft_limit,
            hard_limit: cfg.hard_limit,
        };
        Ok(Self {
            prefix: cfg.prefix,
            store: Mutex::new(MetricStore::new(cfg.buckets, limits)),
            log_callback: None,
        })
    }

    /// Attach a sink for diagnostic events.
    pub fn with_log_callback(mut self, cb: LogCallback) -> Self {
        self.log_callback = Some(cb);
        self
    }

    /// Number of distinct keys currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Serialize the store to exposition text.
    ///
    /// If the store holds more than `soft_limit` keys it is cleared after the
    /// text is captured: this scrape still reports everything, the next one
    /// starts empty.
    pub fn render(&self) -> String {
        let (text, drained, soft_limit) = {
            let mut store = self.lock();
            let text = render(&self.prefix, &store);
            let soft_limit = store.limits().soft_limit;
            (text, store.drain_if_over_soft_limit(), soft_limit)
        };

        if let Some(size) = drained {
            self.emit(
                LogLevel::Info,
                LogEventCode::SoftLimitExceeded,
                "Soft limit exceeded, resetting metrics after scrape",
                params(json!({ "soft_limit": soft_limit, "size": size })),
            );
        }
        text
    }

    fn record(&self, name: &str, tags: &Tags, m: Measurement) {
        let key = canonicalize(name, tags);
        let (admission, limits) = {
            let mut store = self.lock();
            let admission = store.record(&key, m);
            (admission, store.limits())
        };
        self.report_admission(&key, admission, limits);
    }

    fn report_admission(&self, key: &str, admission: Admission, limits: Limits) {
        if let Some(size) = admission.hard_reset {
            self.emit(
                LogLevel::Error,
                LogEventCode::HardLimitReached,
                "Hard limit reached, forcing metrics reset",
                params(json!({
                    "hard_limit": limits.hard_limit,
                    "size": size,
                    "attempted_key": key,
                })),
            );
        }
        if let Some(size) = admission.warned {
            self.emit(
                LogLevel::Warn,
                LogEventCode::ApproachingSoftLimit,
                "Approaching soft limit",
                params(json!({
                    "soft_limit": limits.soft_limit,
                    "warn_at": limits.warn_at,
                    "size": size,
                })),
            );
        }
    }

    fn emit(&self, level: LogLevel, code: LogEventCode, message: &str, params: Map<String, Value>) {
        LogEvent::new(REPORTER_NAME, level, code, message, params).emit(self.log_callback.as_ref());
    }

    fn lock(&self) -> MutexGuard<'_, MetricStore> {
        // Poisoned mutex: keep serving from the inner store.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn params(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

impl Reporter for PrometheusReporter {
    fn report(&self, key: &str, value: f64, tags: &Tags) {
        self.record(key, tags, Measurement::Observe(value));
    }

    fn value(&self, key: &str, value: f64, tags: &Tags) {
        self.record(key, tags, Measurement::Set(value));
    }

    fn increment(&self, key: &str, value: f64, tags: &Tags) {
        self.record(key, tags, Measurement::Increment(value));
    }
}
