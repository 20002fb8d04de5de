//! Structured diagnostic events emitted by reporters.
//!
//! Events are delivered to an optional [`LogCallback`] and always mirrored to
//! `tracing` at the matching level. A missing callback never changes reporter
//! behavior.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogEventCode {
    /// Emergency reset before admitting a new key.
    HardLimitReached,
    /// Reset after a completed scrape.
    SoftLimitExceeded,
    /// Store size reached the warning threshold.
    ApproachingSoftLimit,
}

impl LogEventCode {
    pub fn as_str(self) -> &'static str {
        match self {
            LogEventCode::HardLimitReached => "HARD_LIMIT_REACHED",
            LogEventCode::SoftLimitExceeded => "SOFT_LIMIT_EXCEEDED",
            LogEventCode::ApproachingSoftLimit => "APPROACHING_SOFT_LIMIT",
        }
    }
}

/// One diagnostic event handed to a [`LogCallback`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub code: LogEventCode,
    pub message: String,
    /// Event details with snake_case keys: `hard_limit`, `soft_limit`,
    /// `warn_at`, `size` and `attempted_key`. Sinks expecting the camelCase
    /// names (`hardLimit`, `softLimit`, `warnAt`, `attemptedKey`) must map
    /// them.
    pub params: Map<String, Value>,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    pub reporter: String,
}

/// Sink for diagnostic events.
pub type LogCallback = Arc<dyn Fn(&LogEvent) + Send + Sync>;

impl LogEvent {
    pub fn new(
        reporter: &str,
        level: LogLevel,
        code: LogEventCode,
        message: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            level,
            code,
            message: message.into(),
            params,
            timestamp,
            reporter: reporter.to_string(),
        }
    }

    /// Mirror the event to `tracing`, then hand it to the sink (if any).
    pub fn emit(&self, sink: Option<&LogCallback>) {
        let code = self.code.as_str();
        let params = Value::Object(self.params.clone());
        match self.level {
            LogLevel::Error => tracing::error!(reporter = %self.reporter, code, %params, "{}", self.message),
            LogLevel::Warn => tracing::warn!(reporter = %self.reporter, code, %params, "{}", self.message),
            LogLevel::Info => tracing::info!(reporter = %self.reporter, code, %params, "{}", self.message),
            LogLevel::Debug => tracing::debug!(reporter = %self.reporter, code, %params, "{}", self.message),
        }
        if let Some(cb) = sink {
            cb(self);
        }
    }
}
