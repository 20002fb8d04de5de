//! Label-set formatting (canonical keys).
//!
//! A canonical key is `name` for an empty tag set and
//! `name{a="1",b="2"}` otherwise, with tag names sorted and string values
//! escaped for the Prometheus text format. Non-string values are written as-is.

use std::fmt::Write;

use crate::tags::{TagValue, Tags};

/// Escape a label value (backslash, double quote, newline).
pub fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Build the canonical key for a metric name and tag set.
pub fn canonicalize(name: &str, tags: &Tags) -> String {
    if tags.is_empty() {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len() + tags.len() * 16);
    out.push_str(name);
    out.push('{');
    for (i, (k, v)) in tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = match v {
            TagValue::Str(s) => write!(out, "{}=\"{}\"", k, escape_label(s)),
            other => write!(out, "{}=\"{}\"", k, other),
        };
    }
    out.push('}');
    out
}

/// Split a canonical key into `(name, label_block)`.
///
/// The label block keeps its braces (`{a="1"}`) and is empty when the key has
/// no labels.
pub fn parse(key: &str) -> (&str, &str) {
    match key.find('{') {
        Some(i) => key.split_at(i),
        None => (key, ""),
    }
}

/// Append an extra label to a label block, producing a new block.
///
/// `with_label("", "le", "5")` yields `{le="5"}`;
/// `with_label("{a=\"1\"}", "le", "5")` yields `{a="1",le="5"}`.
pub fn with_label(labels: &str, name: &str, value: &str) -> String {
    match labels.strip_suffix('}') {
        Some(inner) => format!("{inner},{name}=\"{value}\"}}"),
        _ => format!("{{{name}=\"{value}\"}}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_without_tags() {
        assert_eq!(canonicalize("requests", &Tags::new()), "requests");
    }

    #[test]
    fn tag_order_does_not_matter() {
        let a = Tags::new().with("status", "200").with("method", "GET");
        let b = Tags::new().with("method", "GET").with("status", "200");
        assert_eq!(canonicalize("req", &a), canonicalize("req", &b));
        assert_eq!(canonicalize("req", &a), r#"req{method="GET",status="200"}"#);
    }

    #[test]
    fn escapes_string_values() {
        let tags = Tags::new().with("path", "a\\b\"c\nd");
        assert_eq!(canonicalize("m", &tags), r#"m{path="a\\b\"c\nd"}"#);
    }

    #[test]
    fn scalar_values_pass_through() {
        let tags = Tags::new().with("code", 404).with("ok", false).with("ratio", 0.5);
        assert_eq!(canonicalize("m", &tags), r#"m{code="404",ok="false",ratio="0.5"}"#);
    }

    #[test]
    fn parse_splits_on_first_brace() {
        assert_eq!(parse("m"), ("m", ""));
        assert_eq!(parse(r#"m{a="{x}"}"#), ("m", r#"{a="{x}"}"#));
    }

    #[test]
    fn with_label_appends_inside_block() {
        assert_eq!(with_label("", "le", "+Inf"), r#"{le="+Inf"}"#);
        assert_eq!(with_label(r#"{a="}"}"#, "le", "1"), r#"{a="}",le="1"}"#);
    }
}
