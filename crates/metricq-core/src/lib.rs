//! metricq core: metric kinds, update events, collectors, and the exposition
//! encoder.
//!
//! This crate defines the data model shared by the daemon and by producers:
//! what an update means for each metric kind, how labels select a series, and
//! how collector state is snapshotted for scraping. It carries no runtime or
//! transport dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every rejected
//! update surfaces as a `MetricError` so the worker applying events can log
//! and move on.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod collector;
pub mod error;
pub mod event;
pub mod exposition;
pub mod kind;
pub mod labels;

pub use collector::{Collector, MetricSpec, DEFAULT_BUCKETS};
pub use error::{ErrorCode, MetricError, Result};
pub use event::{MetricEvent, Update};
pub use exposition::{encode_text, MetricFamily, Sample, TEXT_CONTENT_TYPE};
pub use kind::MetricKind;
pub use labels::{label_set, LabelSet};
