//! Cardinality-bounded aggregation with Prometheus text exposition.
//!
//! - `store`: per-key records plus the warn/soft/hard limit policy
//! - `render`: exposition text
//! - `reporter`: the thread-safe recording API

pub mod render;
pub mod reporter;
pub mod store;

pub use reporter::PrometheusReporter;
pub use store::{MetricKind, MetricRecord, MetricStore};
