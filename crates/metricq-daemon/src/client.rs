//! Producer-facing client.
//!
//! Each method builds one `MetricEvent` and enqueues it. Nothing here reads or
//! writes the registry, and nothing blocks: updates are fire-and-forget, and
//! the outcome is only visible in the worker's logs and statistics.

use metricq_core::{label_set, MetricEvent};

use crate::queue::EventSender;

#[derive(Clone, Debug)]
pub struct MetricClient {
    tx: EventSender,
}

impl MetricClient {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }

    /// Enqueue a prebuilt event.
    pub fn send(&self, event: MetricEvent) {
        self.tx.push(event);
    }

    pub fn inc_counter(&self, name: &str, amount: f64, labels: &[(&str, &str)]) {
        self.send(MetricEvent::counter_inc(name, amount, label_set(labels)));
    }

    pub fn inc_gauge(&self, name: &str, amount: f64, labels: &[(&str, &str)]) {
        self.send(MetricEvent::gauge_inc(name, amount, label_set(labels)));
    }

    pub fn dec_gauge(&self, name: &str, amount: f64, labels: &[(&str, &str)]) {
        self.send(MetricEvent::gauge_dec(name, amount, label_set(labels)));
    }

    pub fn set_gauge(&self, name: &str, amount: f64, labels: &[(&str, &str)]) {
        self.send(MetricEvent::gauge_set(name, amount, label_set(labels)));
    }

    pub fn update_summary(&self, name: &str, amount: f64, labels: &[(&str, &str)]) {
        self.send(MetricEvent::summary_observe(name, amount, label_set(labels)));
    }

    pub fn update_histogram(&self, name: &str, amount: f64, labels: &[(&str, &str)]) {
        self.send(MetricEvent::histogram_observe(name, amount, label_set(labels)));
    }

    /// Replace the info fields of the selected series.
    pub fn update_info(&self, name: &str, fields: &[(&str, &str)], labels: &[(&str, &str)]) {
        self.send(MetricEvent::info_set(name, label_set(fields), label_set(labels)));
    }

    pub fn update_enum(&self, name: &str, state: &str, labels: &[(&str, &str)]) {
        self.send(MetricEvent::enum_state(name, state, label_set(labels)));
    }

    /// Events queued and not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.tx.pending()
    }
}
