//! Shared error type across metricq crates.

use thiserror::Error;

use crate::kind::MetricKind;

/// Stable error codes (used in logs and by callers matching on failures).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Target metric is not registered.
    MetricNotFound,
    /// Event kind does not match the collector kind.
    KindMismatch,
    /// Event label set does not match the declared label names.
    LabelMismatch,
    /// Amount rejected by the collector (negative counter increment, NaN...).
    InvalidAmount,
    /// Enum state not among the declared states.
    UnknownState,
    /// Metric declaration is invalid (bad name, labels, buckets, states).
    InvalidMetric,
    /// Configuration failed to parse or validate.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Exposition endpoint could not bind its address.
    BindFailed,
    /// Daemon is already running.
    AlreadyRunning,
    /// Internal failure.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MetricNotFound => "METRIC_NOT_FOUND",
            ErrorCode::KindMismatch => "KIND_MISMATCH",
            ErrorCode::LabelMismatch => "LABEL_MISMATCH",
            ErrorCode::InvalidAmount => "INVALID_AMOUNT",
            ErrorCode::UnknownState => "UNKNOWN_STATE",
            ErrorCode::InvalidMetric => "INVALID_METRIC",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::BindFailed => "BIND_FAILED",
            ErrorCode::AlreadyRunning => "ALREADY_RUNNING",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricError>;

/// Unified error type used by core and daemon.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("metric not found: {0}")]
    MetricNotFound(String),
    #[error("kind mismatch for {name}: event is {event}, collector is {collector}")]
    KindMismatch {
        name: String,
        event: MetricKind,
        collector: MetricKind,
    },
    #[error("label mismatch for {name}: expected {expected:?}, got {actual:?}")]
    LabelMismatch {
        name: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("invalid amount for {name}: {reason}")]
    InvalidAmount { name: String, reason: String },
    #[error("unknown state for {name}: {state}")]
    UnknownState { name: String, state: String },
    #[error("invalid metric: {0}")]
    InvalidMetric(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("daemon already running")]
    AlreadyRunning,
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricError::MetricNotFound(_) => ErrorCode::MetricNotFound,
            MetricError::KindMismatch { .. } => ErrorCode::KindMismatch,
            MetricError::LabelMismatch { .. } => ErrorCode::LabelMismatch,
            MetricError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            MetricError::UnknownState { .. } => ErrorCode::UnknownState,
            MetricError::InvalidMetric(_) => ErrorCode::InvalidMetric,
            MetricError::BadConfig(_) => ErrorCode::BadConfig,
            MetricError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            MetricError::Bind { .. } => ErrorCode::BindFailed,
            MetricError::AlreadyRunning => ErrorCode::AlreadyRunning,
            MetricError::Internal(_) => ErrorCode::Internal,
        }
    }
}
