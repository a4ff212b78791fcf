//! Shared state for the exposition endpoint.
//!
//! The scrape handlers only read: a registry snapshot per request and the
//! daemon's draining flag for readiness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::registry::MetricRegistry;

#[derive(Clone)]
pub struct AppState {
    registry: Arc<MetricRegistry>,
    draining: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(registry: Arc<MetricRegistry>, draining: Arc<AtomicBool>) -> Self {
        Self { registry, draining }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }
}
