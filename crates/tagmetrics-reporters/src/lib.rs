//! tagmetrics reporters library entry.
//!
//! - `prometheus`: cardinality-bounded aggregation rendered on scrape
//! - `network`: batched, fire-and-forget UDP transport
//! - `statsd`: push reporter on top of the transport
//! - `config`, `app_state`, `ops`, `router`: exporter process wiring

pub mod app_state;
pub mod config;
pub mod network;
pub mod ops;
pub mod prometheus;
pub mod router;
pub mod statsd;

pub use network::UdpTransport;
pub use prometheus::PrometheusReporter;
pub use statsd::StatsdReporter;
