//! Prometheus text exposition (version 0.0.4).

use std::collections::HashMap;
use std::fmt::Write;

use tagmetrics_core::labels::{parse, with_label};

use super::store::{MetricRecord, MetricStore};

/// Format a sample value the way Prometheus parses it.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

/// Render every record, grouped by prefixed base name in order of first
/// appearance. HELP/TYPE come from the first record seen for a name.
///
/// Returns an empty string for an empty store; otherwise every line,
/// including the last, is newline-terminated.
pub fn render(prefix: &str, store: &MetricStore) -> String {
    let mut groups: Vec<(String, Vec<(&str, &MetricRecord)>)> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for (key, record) in store.iter() {
        let (name, labels) = parse(key);
        let metric_name = format!("{prefix}{name}");
        let idx = match by_name.get(&metric_name) {
            Some(&i) => i,
            None => {
                by_name.insert(metric_name.clone(), groups.len());
                groups.push((metric_name, Vec::new()));
                groups.len() - 1
            }
        };
        groups[idx].1.push((labels, record));
    }

    let mut out = String::new();
    for (name, records) in &groups {
        let Some((_, first)) = records.first() else { continue };
        let kind = first.kind();
        let _ = writeln!(out, "# HELP {} {}", name, kind.help_text());
        let _ = writeln!(out, "# TYPE {} {}", name, kind.as_str());
        for (labels, record) in records {
            write_samples(&mut out, name, labels, record, store.bounds());
        }
    }
    out
}

fn write_samples(out: &mut String, name: &str, labels: &str, record: &MetricRecord, bounds: &[f64]) {
    match record {
        MetricRecord::Counter(v) => {
            let _ = writeln!(out, "{}_total{} {}", name, labels, format_value(*v));
        }
        MetricRecord::Gauge(v) => {
            let _ = writeln!(out, "{}{} {}", name, labels, format_value(*v));
        }
        MetricRecord::Histogram(h) => {
            for (&le, count) in bounds.iter().zip(&h.buckets) {
                let bucket_labels = with_label(labels, "le", &format_value(le));
                let _ = writeln!(out, "{}_bucket{} {}", name, bucket_labels, count);
            }
            let inf_labels = with_label(labels, "le", "+Inf");
            let _ = writeln!(out, "{}_bucket{} {}", name, inf_labels, h.count);
            let _ = writeln!(out, "{}_sum{} {}", name, labels, format_value(h.sum));
            let _ = writeln!(out, "{}_count{} {}", name, labels, h.count);
        }
    }
}
