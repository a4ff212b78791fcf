//! Metric registry: name -> collector.
//!
//! Names are unique across kinds. `create` on a name that is already taken is
//! a silent no-op, even when the new declaration disagrees with the existing
//! collector's kind or labels. Create, remove and lookups go through the
//! `DashMap` shard locks, so they serialize with the worker's reads without a
//! registry-wide lock.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use metricq_core::error::{MetricError, Result};
use metricq_core::{encode_text, Collector, MetricFamily, MetricSpec};

#[derive(Default)]
pub struct MetricRegistry {
    metrics: DashMap<String, Arc<Collector>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            metrics: DashMap::new(),
        }
    }

    /// Allocate and insert a collector unless `spec.name` is already taken.
    ///
    /// Invalid declarations fail only when the name is free.
    pub fn create(&self, spec: MetricSpec) -> Result<()> {
        if self.metrics.contains_key(&spec.name) {
            tracing::debug!(metric = %spec.name, kind = %spec.kind, "metric already exists; create ignored");
            return Ok(());
        }

        let collector = Collector::new(spec)?;
        match self.metrics.entry(collector.name().to_string()) {
            Entry::Occupied(e) => {
                tracing::debug!(metric = %e.key(), "metric created concurrently; create ignored");
            }
            Entry::Vacant(e) => {
                tracing::info!(metric = %collector.name(), kind = %collector.kind(), "metric created");
                e.insert(Arc::new(collector));
            }
        }
        Ok(())
    }

    /// Remove a collector; it disappears from the next scrape.
    pub fn remove(&self, name: &str) -> Result<Arc<Collector>> {
        let (_, collector) = self
            .metrics
            .remove(name)
            .ok_or_else(|| MetricError::MetricNotFound(name.to_string()))?;
        tracing::info!(metric = %name, "metric removed");
        Ok(collector)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Collector>> {
        self.metrics.get(name).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut v: Vec<String> = self.metrics.iter().map(|e| e.key().clone()).collect();
        v.sort();
        v
    }

    /// Snapshot every collector, sorted by metric name.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let collectors: Vec<Arc<Collector>> =
            self.metrics.iter().map(|e| Arc::clone(e.value())).collect();
        let mut families: Vec<MetricFamily> = collectors.iter().map(|c| c.collect()).collect();
        families.sort_by(|a, b| a.name.cmp(&b.name));
        families
    }

    /// Render the registry in the text exposition format.
    pub fn render(&self) -> String {
        encode_text(&self.gather())
    }
}
