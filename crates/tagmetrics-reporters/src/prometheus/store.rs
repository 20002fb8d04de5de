//! Cardinality-bounded metric store.
//!
//! Records are keyed by canonical key and kept in first-write order. The store
//! never fails a write: when the hard limit is reached a new key clears the
//! whole store first, and [`MetricStore::drain_if_over_soft_limit`] clears it
//! after a scrape. Both clears reset the warn latch.

use std::collections::HashMap;

/// Record kind, fixed by the first write to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Value of the `# TYPE` line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }

    /// Value of the `# HELP` line.
    pub fn help_text(self) -> &'static str {
        match self {
            MetricKind::Counter => "Counter metric",
            MetricKind::Gauge => "Gauge metric",
            MetricKind::Histogram => "Histogram metric",
        }
    }
}

/// Histogram state. `buckets[i]` counts observations `<= bounds[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub sum: f64,
    pub count: u64,
    pub buckets: Vec<u64>,
}

impl Histogram {
    fn new(n_bounds: usize) -> Self {
        Self {
            sum: 0.0,
            count: 0,
            buckets: vec![0; n_bounds],
        }
    }

    fn observe(&mut self, bounds: &[f64], v: f64) {
        self.count += 1;
        self.sum += v;
        for (bucket, &le) in self.buckets.iter_mut().zip(bounds) {
            if v <= le {
                *bucket += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricRecord {
    Counter(f64),
    Gauge(f64),
    Histogram(Histogram),
}

impl MetricRecord {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricRecord::Counter(_) => MetricKind::Counter,
            MetricRecord::Gauge(_) => MetricKind::Gauge,
            MetricRecord::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// One write against the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Counter add.
    Increment(f64),
    /// Gauge set.
    Set(f64),
    /// Histogram observation.
    Observe(f64),
}

impl Measurement {
    fn kind(self) -> MetricKind {
        match self {
            Measurement::Increment(_) => MetricKind::Counter,
            Measurement::Set(_) => MetricKind::Gauge,
            Measurement::Observe(_) => MetricKind::Histogram,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub warn_at: usize,
    pub soft_limit: usize,
    pub hard_limit: usize,
}

/// Corrective actions taken by the pre-write admission check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Admission {
    /// Store size right before an emergency clear.
    pub hard_reset: Option<usize>,
    /// Store size when the warn latch fired.
    pub warned: Option<usize>,
}

#[derive(Debug)]
pub struct MetricStore {
    entries: Vec<(String, MetricRecord)>,
    index: HashMap<String, usize>,
    bounds: Vec<f64>,
    limits: Limits,
    warned: bool,
}

impl MetricStore {
    /// `bounds` must be ascending; callers validate it.
    pub fn new(bounds: Vec<f64>, limits: Limits) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            bounds,
            limits,
            warned: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn get(&self, key: &str) -> Option<&MetricRecord> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Records in first-write order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricRecord)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Drop every record and re-arm the warn latch.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.warned = false;
    }

    /// Admission check followed by the write.
    ///
    /// The first write fixes the kind. Counter/gauge cross-writes still apply
    /// to the stored value; any other kind mismatch (into or out of a
    /// histogram) is ignored.
    pub fn record(&mut self, key: &str, m: Measurement) -> Admission {
        let admission = self.admit(key);

        match self.index.get(key) {
            Some(&i) => {
                let record = &mut self.entries[i].1;
                match (record, m) {
                    // Counter and gauge share a scalar: the stored kind is kept,
                    // an increment adds and a set overwrites.
                    (
                        MetricRecord::Counter(v) | MetricRecord::Gauge(v),
                        Measurement::Increment(d),
                    ) => *v += d,
                    (MetricRecord::Counter(v) | MetricRecord::Gauge(v), Measurement::Set(x)) => {
                        *v = x
                    }
                    (MetricRecord::Histogram(h), Measurement::Observe(x)) => h.observe(&self.bounds, x),
                    (record, m) => {
                        tracing::debug!(
                            key,
                            stored = record.kind().as_str(),
                            attempted = m.kind().as_str(),
                            "metric type mismatch; write ignored"
                        );
                    }
                }
            }
            None => {
                let record = match m {
                    Measurement::Increment(d) => MetricRecord::Counter(d),
                    Measurement::Set(x) => MetricRecord::Gauge(x),
                    Measurement::Observe(x) => {
                        let mut h = Histogram::new(self.bounds.len());
                        h.observe(&self.bounds, x);
                        MetricRecord::Histogram(h)
                    }
                };
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), record));
            }
        }

        admission
    }

    /// Pre-write check. Only inspects whether `key` is already present, so the
    /// store may hold `hard_limit` entries before the next new key resets it.
    fn admit(&mut self, key: &str) -> Admission {
        let mut out = Admission::default();

        if self.len() >= self.limits.hard_limit && !self.index.contains_key(key) {
            out.hard_reset = Some(self.len());
            self.clear();
        }

        if !self.warned && self.len() >= self.limits.warn_at {
            out.warned = Some(self.len());
            self.warned = true;
        }

        out
    }

    /// Post-scrape reset: clears the store when it holds more than
    /// `soft_limit` entries. Returns the size before clearing.
    pub fn drain_if_over_soft_limit(&mut self) -> Option<usize> {
        let size = self.len();
        if size > self.limits.soft_limit {
            self.clear();
            return Some(size);
        }
        None
    }
}
