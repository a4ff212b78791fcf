//! Metric update events.
//!
//! A `MetricEvent` is an immutable description of one update: target name,
//! label set and an `Update` carrying both the operation and its payload.
//! The operation fixes the collector kind the event may be applied to.
//!
//! Application rules:
//! - `kind_matches` compares the update's kind with the collector's kind.
//! - `apply` rejects a mismatched collector before touching any series.
//! - Labels are resolved against the collector's declared label names at
//!   apply time; a subset or superset fails the apply.

use std::fmt;

use crate::collector::Collector;
use crate::error::{MetricError, Result};
use crate::kind::MetricKind;
use crate::labels::{self, LabelSet};

/// Operation + payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Counter: increment by a non-negative amount.
    CounterInc(f64),
    /// Gauge: increment.
    GaugeInc(f64),
    /// Gauge: decrement.
    GaugeDec(f64),
    /// Gauge: set.
    GaugeSet(f64),
    /// Summary: record an observation.
    SummaryObserve(f64),
    /// Histogram: record an observation.
    HistogramObserve(f64),
    /// Info: replace the info fields.
    InfoSet(LabelSet),
    /// Enum: switch to one of the declared states.
    EnumState(String),
}

impl Update {
    /// Collector kind this update applies to.
    pub fn kind(&self) -> MetricKind {
        match self {
            Update::CounterInc(_) => MetricKind::Counter,
            Update::GaugeInc(_) | Update::GaugeDec(_) | Update::GaugeSet(_) => MetricKind::Gauge,
            Update::SummaryObserve(_) => MetricKind::Summary,
            Update::HistogramObserve(_) => MetricKind::Histogram,
            Update::InfoSet(_) => MetricKind::Info,
            Update::EnumState(_) => MetricKind::Enum,
        }
    }

    /// Short operation name for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Update::CounterInc(_) | Update::GaugeInc(_) => "inc",
            Update::GaugeDec(_) => "dec",
            Update::GaugeSet(_) => "set",
            Update::SummaryObserve(_) | Update::HistogramObserve(_) => "observe",
            Update::InfoSet(_) => "info",
            Update::EnumState(_) => "state",
        }
    }
}

/// One queued metric update.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvent {
    name: String,
    labels: LabelSet,
    update: Update,
}

impl MetricEvent {
    pub fn new(name: impl Into<String>, update: Update, labels: LabelSet) -> Self {
        Self {
            name: name.into(),
            labels,
            update,
        }
    }

    pub fn counter_inc(name: impl Into<String>, amount: f64, labels: LabelSet) -> Self {
        Self::new(name, Update::CounterInc(amount), labels)
    }

    pub fn gauge_inc(name: impl Into<String>, amount: f64, labels: LabelSet) -> Self {
        Self::new(name, Update::GaugeInc(amount), labels)
    }

    pub fn gauge_dec(name: impl Into<String>, amount: f64, labels: LabelSet) -> Self {
        Self::new(name, Update::GaugeDec(amount), labels)
    }

    pub fn gauge_set(name: impl Into<String>, amount: f64, labels: LabelSet) -> Self {
        Self::new(name, Update::GaugeSet(amount), labels)
    }

    pub fn summary_observe(name: impl Into<String>, amount: f64, labels: LabelSet) -> Self {
        Self::new(name, Update::SummaryObserve(amount), labels)
    }

    pub fn histogram_observe(name: impl Into<String>, amount: f64, labels: LabelSet) -> Self {
        Self::new(name, Update::HistogramObserve(amount), labels)
    }

    pub fn info_set(name: impl Into<String>, fields: LabelSet, labels: LabelSet) -> Self {
        Self::new(name, Update::InfoSet(fields), labels)
    }

    pub fn enum_state(name: impl Into<String>, state: impl Into<String>, labels: LabelSet) -> Self {
        Self::new(name, Update::EnumState(state.into()), labels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn update(&self) -> &Update {
        &self.update
    }

    pub fn kind(&self) -> MetricKind {
        self.update.kind()
    }

    /// True iff `collector` has the kind this event updates.
    pub fn kind_matches(&self, collector: &Collector) -> bool {
        self.kind() == collector.kind()
    }

    /// Apply the update to the series selected by this event's labels.
    pub fn apply(&self, collector: &Collector) -> Result<()> {
        if !self.kind_matches(collector) {
            return Err(MetricError::KindMismatch {
                name: self.name.clone(),
                event: self.kind(),
                collector: collector.kind(),
            });
        }
        let key = labels::resolve(collector.name(), collector.label_names(), &self.labels)?;

        match &self.update {
            Update::CounterInc(v) => collector.counter_inc(key, *v),
            Update::GaugeInc(v) => collector.gauge_add(key, *v),
            Update::GaugeDec(v) => collector.gauge_add(key, -*v),
            Update::GaugeSet(v) => collector.gauge_set(key, *v),
            Update::SummaryObserve(v) => collector.summary_observe(key, *v),
            Update::HistogramObserve(v) => collector.histogram_observe(key, *v),
            Update::InfoSet(fields) => collector.info_set(key, fields),
            Update::EnumState(s) => collector.enum_set(key, s),
        }
    }
}

impl fmt::Display for MetricEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.kind(), self.update.op(), self.name)
    }
}
