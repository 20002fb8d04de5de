//! Reporter seam.
//!
//! Application-facing facades resolve a fully-qualified key and a merged tag
//! set, then forward each measurement to zero or more reporters.

use crate::tags::Tags;

pub trait Reporter: Send + Sync {
    /// Record one observation (histogram / distribution).
    fn report(&self, key: &str, value: f64, tags: &Tags);

    /// Set a gauge (last write wins).
    fn value(&self, key: &str, value: f64, tags: &Tags);

    /// Add `value` to a counter.
    fn increment(&self, key: &str, value: f64, tags: &Tags);

    /// Add 1 to a counter.
    fn incr(&self, key: &str, tags: &Tags) {
        self.increment(key, 1.0, tags);
    }

    /// Release resources held by the reporter. Default: nothing to release.
    fn close(&self) {}
}
