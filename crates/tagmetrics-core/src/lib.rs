//! tagmetrics core: tags, canonical label keys, diagnostic events, and the
//! shared error surface.
//!
//! This crate carries no runtime or network dependencies so it can be used by
//! any reporter implementation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Recording paths
//! must never bring down the instrumented process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod event;
pub mod labels;
pub mod reporter;
pub mod tags;

pub use error::{ErrorCode, Result, TagMetricsError};
pub use event::{LogCallback, LogEvent, LogEventCode, LogLevel};
pub use reporter::Reporter;
pub use tags::{TagValue, Tags};
