//! Label sets and name validation.
//!
//! Events carry labels as an unordered name -> value map. Collectors key their
//! series by the label values laid out in declaration order, so resolving an
//! event's labels against a collector is an exact set comparison followed by a
//! reorder.

use std::collections::BTreeMap;

use crate::error::{MetricError, Result};

/// Label name -> label value.
pub type LabelSet = BTreeMap<String, String>;

/// Series key: label values in the collector's declared label order.
pub type SeriesKey = Vec<String>;

/// Build a label set from borrowed pairs. Later duplicates win.
pub fn label_set(pairs: &[(&str, &str)]) -> LabelSet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Resolve `labels` against the declared label names of metric `name`.
///
/// A subset or superset of the declared names is a `LabelMismatch`.
pub fn resolve(name: &str, declared: &[String], labels: &LabelSet) -> Result<SeriesKey> {
    let mismatch = || MetricError::LabelMismatch {
        name: name.to_string(),
        expected: declared.to_vec(),
        actual: labels.keys().cloned().collect(),
    };

    if declared.len() != labels.len() {
        return Err(mismatch());
    }
    declared
        .iter()
        .map(|d| labels.get(d).cloned().ok_or_else(mismatch))
        .collect()
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(MetricError::InvalidMetric(format!("invalid metric name: {name:?}")))
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, not starting with `__`, no duplicates.
pub fn validate_label_names(names: &[String]) -> Result<()> {
    for (i, n) in names.iter().enumerate() {
        let mut chars = n.chars();
        let ok = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if !ok || n.starts_with("__") {
            return Err(MetricError::InvalidMetric(format!("invalid label name: {n:?}")));
        }
        if names[..i].contains(n) {
            return Err(MetricError::InvalidMetric(format!("duplicate label name: {n:?}")));
        }
    }
    Ok(())
}

/// Escape a label value for the text exposition format.
pub fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
