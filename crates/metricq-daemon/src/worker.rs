//! Worker loop: dequeue events and apply them to the registry.
//!
//! One worker thread is the only writer of collector state. Each cycle it
//! polls the queue without blocking, applies up to `max_events_per_cycle`
//! events, then parks for the refresh period. The stop flag is checked at the
//! cycle boundary, so an apply in progress always completes. Shutdown unparks
//! the thread to cut the final sleep short. The shutdown drain is bounded by
//! the backlog at the moment the stop flag is seen.
//!
//! Failures are local: an event for an unknown metric, of the wrong kind, or
//! rejected by its collector is logged, counted, and dropped. It is never
//! retried.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metricq_core::error::{MetricError, Result};
use metricq_core::MetricEvent;

use crate::queue::EventReceiver;
use crate::registry::MetricRegistry;

/// Outcome counters shared between the worker and observers.
#[derive(Debug, Default)]
pub struct WorkerStats {
    applied: AtomicU64,
    not_found: AtomicU64,
    kind_mismatch: AtomicU64,
    rejected: AtomicU64,
}

impl WorkerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            kind_mismatch: self.kind_mismatch.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &Result<()>) {
        let counter = match outcome {
            Ok(()) => &self.applied,
            Err(MetricError::MetricNotFound(_)) => &self.not_found,
            Err(MetricError::KindMismatch { .. }) => &self.kind_mismatch,
            Err(_) => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub applied: u64,
    pub not_found: u64,
    pub kind_mismatch: u64,
    /// Label mismatches and amounts/states refused by the collector.
    pub rejected: u64,
}

impl StatsSnapshot {
    /// Events dequeued so far, whatever their outcome.
    pub fn processed(&self) -> u64 {
        self.applied + self.dropped()
    }

    pub fn dropped(&self) -> u64 {
        self.not_found + self.kind_mismatch + self.rejected
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub refresh: Duration,
    pub max_events_per_cycle: usize,
    pub drain_on_shutdown: bool,
}

/// Look up the event's target and apply it.
pub fn apply_event(registry: &MetricRegistry, event: &MetricEvent) -> Result<()> {
    let collector = registry
        .get(event.name())
        .ok_or_else(|| MetricError::MetricNotFound(event.name().to_string()))?;
    if !event.kind_matches(&collector) {
        return Err(MetricError::KindMismatch {
            name: event.name().to_string(),
            event: event.kind(),
            collector: collector.kind(),
        });
    }
    event.apply(&collector)
}

pub struct Worker {
    registry: Arc<MetricRegistry>,
    rx: EventReceiver,
    stop: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
    opts: WorkerOptions,
}

impl Worker {
    pub fn new(
        registry: Arc<MetricRegistry>,
        rx: EventReceiver,
        stop: Arc<AtomicBool>,
        stats: Arc<WorkerStats>,
        opts: WorkerOptions,
    ) -> Self {
        Self {
            registry,
            rx,
            stop,
            stats,
            opts,
        }
    }

    /// Give back the receiver of a worker that never ran.
    pub fn into_receiver(self) -> EventReceiver {
        self.rx
    }

    /// Run until the stop flag is observed. Hands the receiver back so the
    /// daemon can start a new worker later.
    pub fn run(mut self) -> EventReceiver {
        tracing::info!(
            refresh_ms = self.opts.refresh.as_millis() as u64,
            max_events_per_cycle = self.opts.max_events_per_cycle,
            "worker started"
        );

        while !self.stop.load(Ordering::Acquire) {
            for _ in 0..self.opts.max_events_per_cycle {
                let Some(event) = self.rx.try_dequeue() else { break; };
                self.process(&event);
            }
            thread::park_timeout(self.opts.refresh);
        }

        if self.opts.drain_on_shutdown {
            // Only what was queued when the stop flag was seen; later pushes
            // stay queued for the next run.
            let backlog = self.rx.pending();
            let mut drained = 0u64;
            for _ in 0..backlog {
                let Some(event) = self.rx.try_dequeue() else { break; };
                self.process(&event);
                drained += 1;
            }
            tracing::info!(drained, left = self.rx.pending(), "worker drained queue");
        } else {
            tracing::info!(left = self.rx.pending(), "worker stopped without draining");
        }

        tracing::info!("worker stopped");
        self.rx
    }

    fn process(&self, event: &MetricEvent) {
        let outcome = apply_event(&self.registry, event);
        self.stats.record(&outcome);

        if let Err(e) = outcome {
            match &e {
                MetricError::MetricNotFound(_) | MetricError::KindMismatch { .. } => {
                    tracing::error!(event = %event, code = e.code().as_str(), error = %e, "event dropped");
                }
                _ => {
                    tracing::warn!(event = %event, code = e.code().as_str(), error = %e, "event rejected");
                }
            }
        }
    }
}
