//! Analysis error types

use std::time::Duration;

/// Backend and engine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// Backend cannot be reached
    #[error("analysis backend unavailable: {0}")]
    Unavailable(String),

    /// Snapshot was never created, expired or was disposed
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Backend rejected the snapshot
    #[error("snapshot {snapshot} failed to initialise: {message}")]
    InitFailed {
        /// Snapshot name
        snapshot: String,
        /// Backend message
        message: String,
    },

    /// Backend call exceeded its budget
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        /// Backend operation
        operation: &'static str,
        /// Budget
        after: Duration,
    },
}

impl AnalysisError {
    /// Create init failure
    pub fn init_failed(snapshot: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InitFailed {
            snapshot: snapshot.into(),
            message: message.into(),
        }
    }

    /// Whether a retry could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}
