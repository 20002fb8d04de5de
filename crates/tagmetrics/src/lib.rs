//! Top-level facade crate for tagmetrics.
//!
//! Re-exports core types and the reporters library so users can depend on a single crate.

pub mod core {
    pub use tagmetrics_core::*;
}

pub mod reporters {
    pub use tagmetrics_reporters::*;
}
