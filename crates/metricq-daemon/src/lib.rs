//! metricq daemon library entry.
//!
//! This crate wires the registry, event queue, worker loop, producer client
//! and exposition endpoint into a `MetricDaemon`. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod client;
pub mod config;
pub mod daemon;
pub mod ops;
pub mod queue;
pub mod registry;
pub mod router;
pub mod server;
pub mod worker;

pub use client::MetricClient;
pub use daemon::{DaemonState, MetricDaemon};
pub use registry::MetricRegistry;
pub use worker::StatsSnapshot;
