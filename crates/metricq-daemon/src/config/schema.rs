use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use metricq_core::error::{MetricError, Result};
use metricq_core::{MetricKind, MetricSpec};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    pub version: u32,

    #[serde(default)]
    pub daemon: DaemonSection,

    #[serde(default)]
    pub metrics: Vec<MetricDecl>,
}

impl DaemonConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricError::UnsupportedVersion);
        }

        self.daemon.validate()?;

        let mut seen = HashSet::new();
        for m in &self.metrics {
            if !seen.insert(m.name.as_str()) {
                return Err(MetricError::BadConfig(format!(
                    "metric {} declared more than once",
                    m.name
                )));
            }
            m.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Worker cycle period in seconds (fractional allowed).
    #[serde(default = "default_refresh_rate_secs")]
    pub refresh_rate_secs: f64,

    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    #[serde(default = "default_max_events_per_cycle")]
    pub max_events_per_cycle: usize,

    /// Apply everything still queued when shutdown stops the worker.
    #[serde(default = "default_drain_on_shutdown")]
    pub drain_on_shutdown: bool,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            refresh_rate_secs: default_refresh_rate_secs(),
            metrics_path: default_metrics_path(),
            max_events_per_cycle: default_max_events_per_cycle(),
            drain_on_shutdown: default_drain_on_shutdown(),
        }
    }
}

impl DaemonSection {
    pub fn validate(&self) -> Result<()> {
        refresh_period(self.refresh_rate_secs)?;
        if !self.metrics_path.starts_with('/') {
            return Err(MetricError::BadConfig(
                "daemon.metrics_path must start with '/'".into(),
            ));
        }
        if let Some(c) = self
            .metrics_path
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-')))
        {
            return Err(MetricError::BadConfig(format!(
                "daemon.metrics_path may not contain {c:?}"
            )));
        }
        if self.metrics_path.contains("//") {
            return Err(MetricError::BadConfig(
                "daemon.metrics_path may not contain empty segments".into(),
            ));
        }
        if self.metrics_path == "/healthz" || self.metrics_path == "/readyz" {
            return Err(MetricError::BadConfig(format!(
                "daemon.metrics_path may not shadow {}",
                self.metrics_path
            )));
        }
        if self.max_events_per_cycle == 0 {
            return Err(MetricError::BadConfig(
                "daemon.max_events_per_cycle must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Convert a refresh rate in seconds into the worker's cycle period.
pub fn refresh_period(secs: f64) -> Result<Duration> {
    if !(secs > 0.0 && secs <= 60.0) {
        return Err(MetricError::BadConfig(format!(
            "refresh rate must be in (0, 60] seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| MetricError::BadConfig(format!("refresh rate {secs}: {e}")))
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8081
}
fn default_refresh_rate_secs() -> f64 {
    0.5
}
fn default_metrics_path() -> String {
    "/metrics".into()
}
fn default_max_events_per_cycle() -> usize {
    1
}
fn default_drain_on_shutdown() -> bool {
    true
}

/// A metric created when the daemon is built from config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricDecl {
    pub name: String,
    pub kind: MetricKind,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub buckets: Option<Vec<f64>>,
}

impl MetricDecl {
    pub fn validate(&self) -> Result<()> {
        if !self.states.is_empty() && self.kind != MetricKind::Enum {
            return Err(MetricError::BadConfig(format!(
                "metric {}: states are only valid for enum metrics",
                self.name
            )));
        }
        if self.buckets.is_some() && self.kind != MetricKind::Histogram {
            return Err(MetricError::BadConfig(format!(
                "metric {}: buckets are only valid for histogram metrics",
                self.name
            )));
        }
        Ok(())
    }

    pub fn to_spec(&self) -> MetricSpec {
        let mut spec = MetricSpec::new(self.kind, self.name.clone(), self.help.clone())
            .labels(&self.labels)
            .states(&self.states);
        if let Some(b) = &self.buckets {
            spec = spec.buckets(b);
        }
        spec
    }
}
