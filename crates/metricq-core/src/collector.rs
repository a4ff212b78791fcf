//! Typed collectors with labeled series.
//!
//! A `Collector` backs one named metric. Its kind, label names, enum states and
//! histogram buckets are fixed at construction; per-series values live in a
//! `DashMap` keyed by label values in declaration order. Series state can only
//! be mutated from inside this crate (through `MetricEvent::apply`), so callers
//! holding an `Arc<Collector>` get a read-only view.

use dashmap::DashMap;

use crate::error::{MetricError, Result};
use crate::exposition::{MetricFamily, Sample};
use crate::kind::MetricKind;
use crate::labels::{self, LabelSet, SeriesKey};

/// Default histogram buckets (seconds-scale latencies).
pub const DEFAULT_BUCKETS: [f64; 15] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
    f64::INFINITY,
];

/// Declaration of a metric, validated by `Collector::new`.
#[derive(Debug, Clone)]
pub struct MetricSpec {
    pub kind: MetricKind,
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    /// Enum only.
    pub states: Vec<String>,
    /// Histogram only. `None` selects `DEFAULT_BUCKETS`.
    pub buckets: Option<Vec<f64>>,
}

impl MetricSpec {
    pub fn new(kind: MetricKind, name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            help: help.into(),
            label_names: Vec::new(),
            states: Vec::new(),
            buckets: None,
        }
    }

    pub fn labels<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.label_names = names.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn states<S: AsRef<str>>(mut self, states: &[S]) -> Self {
        self.states = states.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn buckets(mut self, buckets: &[f64]) -> Self {
        self.buckets = Some(buckets.to_vec());
        self
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SummaryState {
    count: u64,
    sum: f64,
}

#[derive(Debug, Clone)]
struct HistogramState {
    /// Non-cumulative per-bucket counts, parallel to the bucket bounds.
    counts: Vec<u64>,
    sum: f64,
}

impl HistogramState {
    fn new(n: usize) -> Self {
        Self {
            counts: vec![0; n],
            sum: 0.0,
        }
    }
}

#[derive(Debug)]
enum Series {
    Counter(DashMap<SeriesKey, f64>),
    Gauge(DashMap<SeriesKey, f64>),
    Summary(DashMap<SeriesKey, SummaryState>),
    Histogram {
        bounds: Vec<f64>,
        series: DashMap<SeriesKey, HistogramState>,
    },
    Info(DashMap<SeriesKey, LabelSet>),
    Enum {
        states: Vec<String>,
        series: DashMap<SeriesKey, usize>,
    },
}

/// The stateful object backing one named metric.
#[derive(Debug)]
pub struct Collector {
    name: String,
    help: String,
    label_names: Vec<String>,
    series: Series,
}

impl Collector {
    /// Validate `spec` and allocate the collector. Unlabeled metrics start
    /// with their default series so they are visible before the first update.
    pub fn new(spec: MetricSpec) -> Result<Self> {
        labels::validate_metric_name(&spec.name)?;
        labels::validate_label_names(&spec.label_names)?;

        let reserved = match spec.kind {
            MetricKind::Histogram => Some("le"),
            MetricKind::Summary => Some("quantile"),
            _ => None,
        };
        if let Some(r) = reserved {
            if spec.label_names.iter().any(|l| l == r) {
                return Err(MetricError::InvalidMetric(format!(
                    "{} may not use reserved label {r:?}",
                    spec.kind
                )));
            }
        }

        let series = match spec.kind {
            MetricKind::Counter => Series::Counter(DashMap::new()),
            MetricKind::Gauge => Series::Gauge(DashMap::new()),
            MetricKind::Summary => Series::Summary(DashMap::new()),
            MetricKind::Histogram => Series::Histogram {
                bounds: normalize_buckets(spec.buckets.as_deref())?,
                series: DashMap::new(),
            },
            MetricKind::Info => Series::Info(DashMap::new()),
            MetricKind::Enum => {
                validate_states(&spec)?;
                Series::Enum {
                    states: spec.states.clone(),
                    series: DashMap::new(),
                }
            }
        };

        let collector = Self {
            name: spec.name,
            help: spec.help,
            label_names: spec.label_names,
            series,
        };
        if collector.label_names.is_empty() {
            collector.init_series(Vec::new());
        }
        Ok(collector)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn kind(&self) -> MetricKind {
        match &self.series {
            Series::Counter(_) => MetricKind::Counter,
            Series::Gauge(_) => MetricKind::Gauge,
            Series::Summary(_) => MetricKind::Summary,
            Series::Histogram { .. } => MetricKind::Histogram,
            Series::Info(_) => MetricKind::Info,
            Series::Enum { .. } => MetricKind::Enum,
        }
    }

    /// Declared enum states (empty for other kinds).
    pub fn states(&self) -> &[String] {
        match &self.series {
            Series::Enum { states, .. } => states,
            _ => &[],
        }
    }

    /// Histogram bucket upper bounds, `+Inf` last (empty for other kinds).
    pub fn buckets(&self) -> &[f64] {
        match &self.series {
            Series::Histogram { bounds, .. } => bounds,
            _ => &[],
        }
    }

    /// Number of live series.
    pub fn series_count(&self) -> usize {
        match &self.series {
            Series::Counter(m) | Series::Gauge(m) => m.len(),
            Series::Summary(m) => m.len(),
            Series::Histogram { series, .. } => series.len(),
            Series::Info(m) => m.len(),
            Series::Enum { series, .. } => series.len(),
        }
    }

    /// Current value of a counter or gauge series.
    pub fn value(&self, label_values: &[&str]) -> Option<f64> {
        let key = key_of(label_values);
        match &self.series {
            Series::Counter(m) | Series::Gauge(m) => m.get(&key).map(|v| *v),
            _ => None,
        }
    }

    /// Observation count of a summary or histogram series.
    pub fn sample_count(&self, label_values: &[&str]) -> Option<u64> {
        let key = key_of(label_values);
        match &self.series {
            Series::Summary(m) => m.get(&key).map(|s| s.count),
            Series::Histogram { series, .. } => series.get(&key).map(|h| h.counts.iter().sum()),
            _ => None,
        }
    }

    /// Observation sum of a summary or histogram series.
    pub fn sample_sum(&self, label_values: &[&str]) -> Option<f64> {
        let key = key_of(label_values);
        match &self.series {
            Series::Summary(m) => m.get(&key).map(|s| s.sum),
            Series::Histogram { series, .. } => series.get(&key).map(|h| h.sum),
            _ => None,
        }
    }

    /// Current state of an enum series.
    pub fn state(&self, label_values: &[&str]) -> Option<String> {
        let key = key_of(label_values);
        match &self.series {
            Series::Enum { states, series } => series
                .get(&key)
                .and_then(|i| states.get(*i).cloned()),
            _ => None,
        }
    }

    /// Current fields of an info series.
    pub fn info(&self, label_values: &[&str]) -> Option<LabelSet> {
        let key = key_of(label_values);
        match &self.series {
            Series::Info(m) => m.get(&key).map(|v| v.clone()),
            _ => None,
        }
    }

    // --------------------
    // Mutation (crate-private; driven by MetricEvent::apply)
    // --------------------

    fn init_series(&self, key: SeriesKey) {
        match &self.series {
            Series::Counter(m) | Series::Gauge(m) => {
                m.entry(key).or_insert(0.0);
            }
            Series::Summary(m) => {
                m.entry(key).or_default();
            }
            Series::Histogram { bounds, series } => {
                series
                    .entry(key)
                    .or_insert_with(|| HistogramState::new(bounds.len()));
            }
            Series::Info(m) => {
                m.entry(key).or_default();
            }
            Series::Enum { series, .. } => {
                series.entry(key).or_insert(0);
            }
        }
    }

    fn mismatch(&self, event: MetricKind) -> MetricError {
        MetricError::KindMismatch {
            name: self.name.clone(),
            event,
            collector: self.kind(),
        }
    }

    pub(crate) fn counter_inc(&self, key: SeriesKey, amount: f64) -> Result<()> {
        let Series::Counter(m) = &self.series else {
            return Err(self.mismatch(MetricKind::Counter));
        };
        // `!(x >= 0)` also rejects NaN.
        if !(amount >= 0.0) {
            return Err(MetricError::InvalidAmount {
                name: self.name.clone(),
                reason: format!("counters can only be incremented by non-negative amounts, got {amount}"),
            });
        }
        *m.entry(key).or_insert(0.0) += amount;
        Ok(())
    }

    pub(crate) fn gauge_add(&self, key: SeriesKey, delta: f64) -> Result<()> {
        let Series::Gauge(m) = &self.series else {
            return Err(self.mismatch(MetricKind::Gauge));
        };
        *m.entry(key).or_insert(0.0) += delta;
        Ok(())
    }

    pub(crate) fn gauge_set(&self, key: SeriesKey, value: f64) -> Result<()> {
        let Series::Gauge(m) = &self.series else {
            return Err(self.mismatch(MetricKind::Gauge));
        };
        m.insert(key, value);
        Ok(())
    }

    pub(crate) fn summary_observe(&self, key: SeriesKey, value: f64) -> Result<()> {
        let Series::Summary(m) = &self.series else {
            return Err(self.mismatch(MetricKind::Summary));
        };
        let mut s = m.entry(key).or_default();
        s.count += 1;
        s.sum += value;
        Ok(())
    }

    pub(crate) fn histogram_observe(&self, key: SeriesKey, value: f64) -> Result<()> {
        let Series::Histogram { bounds, series } = &self.series else {
            return Err(self.mismatch(MetricKind::Histogram));
        };
        let mut h = series
            .entry(key)
            .or_insert_with(|| HistogramState::new(bounds.len()));
        h.sum += value;
        // The last bound is +Inf, so a non-NaN value always lands somewhere.
        if let Some(i) = bounds.iter().position(|b| value <= *b) {
            h.counts[i] += 1;
        } else if let Some(last) = h.counts.last_mut() {
            *last += 1;
        }
        Ok(())
    }

    pub(crate) fn info_set(&self, key: SeriesKey, fields: &LabelSet) -> Result<()> {
        let Series::Info(m) = &self.series else {
            return Err(self.mismatch(MetricKind::Info));
        };
        if let Some(clash) = fields.keys().find(|k| self.label_names.contains(*k)) {
            return Err(MetricError::InvalidAmount {
                name: self.name.clone(),
                reason: format!("info key {clash:?} overlaps a label name"),
            });
        }
        if let Err(e) = labels::validate_label_names(&fields.keys().cloned().collect::<Vec<_>>()) {
            return Err(MetricError::InvalidAmount {
                name: self.name.clone(),
                reason: e.to_string(),
            });
        }
        m.insert(key, fields.clone());
        Ok(())
    }

    pub(crate) fn enum_set(&self, key: SeriesKey, state: &str) -> Result<()> {
        let Series::Enum { states, series } = &self.series else {
            return Err(self.mismatch(MetricKind::Enum));
        };
        let idx = states
            .iter()
            .position(|s| s == state)
            .ok_or_else(|| MetricError::UnknownState {
                name: self.name.clone(),
                state: state.to_string(),
            })?;
        series.insert(key, idx);
        Ok(())
    }

    // --------------------
    // Exposition
    // --------------------

    /// Snapshot the collector into an exposition family.
    pub fn collect(&self) -> MetricFamily {
        let mut samples = Vec::new();
        let name = self.name.as_str();

        match &self.series {
            Series::Counter(m) | Series::Gauge(m) => {
                for (key, v) in sorted(m) {
                    samples.push(Sample::new(name, self.pairs(&key), v));
                }
            }
            Series::Summary(m) => {
                for (key, s) in sorted(m) {
                    let pairs = self.pairs(&key);
                    samples.push(Sample::new(format!("{name}_count"), pairs.clone(), s.count as f64));
                    samples.push(Sample::new(format!("{name}_sum"), pairs, s.sum));
                }
            }
            Series::Histogram { bounds, series } => {
                for (key, h) in sorted(series) {
                    let pairs = self.pairs(&key);
                    let mut acc = 0u64;
                    for (bound, count) in bounds.iter().zip(&h.counts) {
                        acc += count;
                        let mut with_le = pairs.clone();
                        with_le.push(("le".to_string(), crate::exposition::format_value(*bound)));
                        samples.push(Sample::new(format!("{name}_bucket"), with_le, acc as f64));
                    }
                    samples.push(Sample::new(format!("{name}_count"), pairs.clone(), acc as f64));
                    samples.push(Sample::new(format!("{name}_sum"), pairs, h.sum));
                }
            }
            Series::Info(m) => {
                for (key, fields) in sorted(m) {
                    let mut pairs = self.pairs(&key);
                    pairs.extend(fields);
                    samples.push(Sample::new(format!("{name}_info"), pairs, 1.0));
                }
            }
            Series::Enum { states, series } => {
                for (key, current) in sorted(series) {
                    let pairs = self.pairs(&key);
                    for (i, s) in states.iter().enumerate() {
                        let mut with_state = pairs.clone();
                        with_state.push((name.to_string(), s.clone()));
                        let v = if i == current { 1.0 } else { 0.0 };
                        samples.push(Sample::new(name, with_state, v));
                    }
                }
            }
        }

        MetricFamily {
            name: self.name.clone(),
            help: self.help.clone(),
            kind: self.kind(),
            samples,
        }
    }

    fn pairs(&self, key: &[String]) -> Vec<(String, String)> {
        self.label_names
            .iter()
            .cloned()
            .zip(key.iter().cloned())
            .collect()
    }
}

fn key_of(label_values: &[&str]) -> SeriesKey {
    label_values.iter().map(|s| s.to_string()).collect()
}

fn sorted<T: Clone>(m: &DashMap<SeriesKey, T>) -> Vec<(SeriesKey, T)> {
    let mut v: Vec<(SeriesKey, T)> = m
        .iter()
        .map(|r| (r.key().clone(), r.value().clone()))
        .collect();
    v.sort_by(|a, b| a.0.cmp(&b.0));
    v
}

fn normalize_buckets(buckets: Option<&[f64]>) -> Result<Vec<f64>> {
    let Some(b) = buckets else {
        return Ok(DEFAULT_BUCKETS.to_vec());
    };
    let mut out = b.to_vec();
    if out.iter().any(|x| x.is_nan()) {
        return Err(MetricError::InvalidMetric("histogram buckets may not be NaN".into()));
    }
    if out.windows(2).any(|w| w[0] >= w[1]) {
        return Err(MetricError::InvalidMetric(
            "histogram buckets must be strictly increasing".into(),
        ));
    }
    if out.last() != Some(&f64::INFINITY) {
        out.push(f64::INFINITY);
    }
    if out.len() < 2 {
        return Err(MetricError::InvalidMetric(
            "histogram needs at least two buckets".into(),
        ));
    }
    Ok(out)
}

fn validate_states(spec: &MetricSpec) -> Result<()> {
    if spec.states.is_empty() {
        return Err(MetricError::InvalidMetric(format!(
            "enum {} needs at least one state",
            spec.name
        )));
    }
    for (i, s) in spec.states.iter().enumerate() {
        if spec.states[..i].contains(s) {
            return Err(MetricError::InvalidMetric(format!(
                "enum {} has duplicate state {s:?}",
                spec.name
            )));
        }
    }
    if spec.label_names.contains(&spec.name) {
        return Err(MetricError::InvalidMetric(format!(
            "enum {} may not use its own name as a label",
            spec.name
        )));
    }
    // The state label is named after the metric.
    labels::validate_label_names(std::slice::from_ref(&spec.name)).map_err(|_| {
        MetricError::InvalidMetric(format!(
            "enum name {:?} is not a valid label name",
            spec.name
        ))
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn unlabeled_metrics_start_with_default_series() {
        let c = Collector::new(MetricSpec::new(MetricKind::Counter, "x", "none")).unwrap();
        assert_eq!(c.value(&[]), Some(0.0));

        let e = Collector::new(
            MetricSpec::new(MetricKind::Enum, "phase", "none").states(&["idle", "busy"]),
        )
        .unwrap();
        assert_eq!(e.state(&[]).as_deref(), Some("idle"));
    }

    #[test]
    fn labeled_metrics_start_empty() {
        let g = Collector::new(MetricSpec::new(MetricKind::Gauge, "sec", "none").labels(&["succeed"]))
            .unwrap();
        assert_eq!(g.series_count(), 0);
        assert_eq!(g.value(&["True"]), None);
    }

    #[test]
    fn bucket_normalization() {
        let h = Collector::new(
            MetricSpec::new(MetricKind::Histogram, "lat", "none").buckets(&[0.1, 1.0]),
        )
        .unwrap();
        assert_eq!(h.buckets(), &[0.1, 1.0, f64::INFINITY]);

        let d = Collector::new(MetricSpec::new(MetricKind::Histogram, "lat", "none")).unwrap();
        assert_eq!(d.buckets().len(), DEFAULT_BUCKETS.len());

        for bad in [&[1.0, 0.5][..], &[1.0, 1.0][..], &[f64::INFINITY][..], &[f64::NAN][..]] {
            let err = Collector::new(MetricSpec::new(MetricKind::Histogram, "lat", "none").buckets(bad))
                .unwrap_err();
            assert_eq!(err.code().as_str(), "INVALID_METRIC");
        }
    }

    #[test]
    fn reserved_labels_and_enum_rules() {
        let bad = [
            MetricSpec::new(MetricKind::Histogram, "h", "none").labels(&["le"]),
            MetricSpec::new(MetricKind::Summary, "s", "none").labels(&["quantile"]),
            MetricSpec::new(MetricKind::Enum, "e", "none"),
            MetricSpec::new(MetricKind::Enum, "e", "none").states(&["a", "a"]),
            MetricSpec::new(MetricKind::Enum, "e", "none").labels(&["e"]).states(&["a"]),
            MetricSpec::new(MetricKind::Enum, "job:phase", "none").states(&["idle"]),
            MetricSpec::new(MetricKind::Enum, "__phase", "none").states(&["idle"]),
        ];
        for spec in bad {
            assert!(Collector::new(spec).is_err());
        }

        // Colons stay legal for other kinds.
        assert!(Collector::new(MetricSpec::new(MetricKind::Gauge, "job:phase", "none")).is_ok());
    }

    #[test]
    fn histogram_buckets_are_cumulative_in_snapshot() {
        let h = Collector::new(
            MetricSpec::new(MetricKind::Histogram, "lat", "none").buckets(&[1.0, 2.0]),
        )
        .unwrap();
        h.histogram_observe(vec![], 0.5).unwrap();
        h.histogram_observe(vec![], 1.5).unwrap();
        h.histogram_observe(vec![], 9.0).unwrap();

        let fam = h.collect();
        let buckets: Vec<f64> = fam
            .samples
            .iter()
            .filter(|s| s.name == "lat_bucket")
            .map(|s| s.value)
            .collect();
        assert_eq!(buckets, vec![1.0, 2.0, 3.0]);
        assert_eq!(h.sample_count(&[]), Some(3));
        assert_eq!(h.sample_sum(&[]), Some(11.0));
    }
}
