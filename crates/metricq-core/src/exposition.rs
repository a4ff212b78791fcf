//! Exposition snapshot types and the text format encoder.
//!
//! Collectors are snapshotted into `MetricFamily` values (one per metric),
//! which the encoder renders in the Prometheus text exposition format
//! (version 0.0.4).

use std::fmt::Write;

use crate::kind::MetricKind;
use crate::labels::escape_label;

/// Content type served alongside `encode_text` output.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// One exposed line: sample name, label pairs, value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    pub fn new(name: impl Into<String>, labels: Vec<(String, String)>, value: f64) -> Self {
        Self {
            name: name.into(),
            labels,
            value,
        }
    }
}

/// Snapshot of one collector.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    /// Name used on the `# HELP` / `# TYPE` lines.
    pub fn exposition_name(&self) -> String {
        match self.kind {
            MetricKind::Info => format!("{}_info", self.name),
            _ => self.name.clone(),
        }
    }

    /// First sample matching `name` and carrying all of `labels`.
    pub fn sample(&self, name: &str, labels: &[(&str, &str)]) -> Option<&Sample> {
        self.samples.iter().find(|s| {
            s.name == name
                && labels
                    .iter()
                    .all(|(k, v)| s.labels.iter().any(|(sk, sv)| sk == k && sv == v))
        })
    }
}

/// Format a sample value the way scrapers expect (`+Inf`, `-Inf`, `NaN`).
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{v:?}")
    }
}

fn escape_help(h: &str) -> String {
    h.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Render families in the text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for fam in families {
        let mname = fam.exposition_name();
        let _ = writeln!(out, "# HELP {} {}", mname, escape_help(&fam.help));
        let _ = writeln!(out, "# TYPE {} {}", mname, fam.kind.exposition_type());
        for s in &fam.samples {
            if s.labels.is_empty() {
                let _ = writeln!(out, "{} {}", s.name, format_value(s.value));
            } else {
                let label_str = s
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                    .collect::<Vec<_>>()
                    .join(",");
                let _ = writeln!(out, "{}{{{}}} {}", s.name, label_str, format_value(s.value));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values() {
        assert_eq!(format_value(25.0), "25.0");
        assert_eq!(format_value(-2.0), "-2.0");
        assert_eq!(format_value(0.005), "0.005");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn renders_help_type_and_labels() {
        let fam = MetricFamily {
            name: "total".into(),
            help: "line one\nline two".into(),
            kind: MetricKind::Counter,
            samples: vec![Sample::new(
                "total",
                vec![("succeed".into(), "say \"hi\"".into())],
                25.0,
            )],
        };
        let text = encode_text(&[fam]);
        assert_eq!(
            text,
            "# HELP total line one\\nline two\n\
             # TYPE total counter\n\
             total{succeed=\"say \\\"hi\\\"\"} 25.0\n"
        );
    }
}
