//! Top-level facade crate for metricq.
//!
//! Re-exports the core data model and the daemon library so users can depend
//! on a single crate.

pub mod core {
    pub use metricq_core::*;
}

pub mod daemon {
    pub use metricq_daemon::*;
}

pub use metricq_core::{MetricError, MetricEvent, MetricKind, MetricSpec, Result};
pub use metricq_daemon::{MetricClient, MetricDaemon};
