//! Error types for the deployment orchestrator
//!
//! Validation findings and health failures are not errors here: they end up
//! on the [`DeploymentRecord`](netgate_model::DeploymentRecord) as `FAILED` or
//! `ROLLED_BACK`. `Err` is reserved for requests that cannot start and for
//! storage faults.

use netgate_model::{ContentHash, DeploymentId, DeviceId, TransitionError};
use std::path::PathBuf;

/// Orchestrator errors
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Device is not registered
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// Another real deployment or rollback holds the device
    #[error("deployment in progress for {device} ({holder})")]
    DeploymentInProgress {
        /// Device
        device: DeviceId,
        /// Record holding the device
        holder: DeploymentId,
    },

    /// A failed restore left the device in an unknown state
    #[error("device {device} is degraded: {reason}")]
    DeviceDegraded {
        /// Device
        device: DeviceId,
        /// Reason recorded when the device was marked
        reason: String,
    },

    /// No committed record to roll back to
    #[error("no committed revision for {device}: {detail}")]
    NoCommittedRevision {
        /// Device
        device: DeviceId,
        /// What was looked for
        detail: String,
    },

    /// Deployment record not found
    #[error("deployment not found: {0}")]
    DeploymentNotFound(DeploymentId),

    /// Static analysis could not produce a result
    #[error("verification backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Illegal state change
    #[error("state machine: {0}")]
    Transition(#[from] TransitionError),

    /// Repository failure
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
}

impl DeployError {
    /// Whether the error means the device needs an operator
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceDegraded { .. } | Self::Transition(_))
    }

    /// Whether the same request may succeed later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DeploymentInProgress { .. }
                | Self::BackendUnavailable(_)
                | Self::Repository(RepositoryError::Io { .. } | RepositoryError::Locked { .. })
        )
    }
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Device is not registered
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// Device registered twice
    #[error("device already registered: {0}")]
    DuplicateDevice(DeviceId),

    /// Current snapshot is not the one the caller captured
    #[error("current config of {device} changed underneath (expected {expected}, found {actual})")]
    StaleCurrent {
        /// Device
        device: DeviceId,
        /// Hash the caller expected
        expected: ContentHash,
        /// Hash actually stored
        actual: ContentHash,
    },

    /// Record belongs to another device
    #[error("record {record} belongs to {owner}, not {device}")]
    RecordMismatch {
        /// Record
        record: DeploymentId,
        /// Device named in the record
        owner: DeviceId,
        /// Device the call targeted
        device: DeviceId,
    },

    /// State file IO failure
    #[error("io error on {path}: {source}")]
    Io {
        /// File
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// State file could not be encoded or decoded
    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        /// File
        path: PathBuf,
        /// Cause
        #[source]
        source: serde_json::Error,
    },

    /// Another process holds the state directory lock
    #[error("state directory {path} is in use by another netgate process")]
    Locked {
        /// State directory
        path: PathBuf,
    },

    /// Injected or backend-specific write failure
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

impl RepositoryError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let busy = DeployError::DeploymentInProgress {
            device: DeviceId::new("r1"),
            holder: DeploymentId::new(),
        };
        assert!(busy.is_retryable());
        assert!(!busy.is_fatal());
        assert!(busy.to_string().contains("deployment in progress"));

        let degraded = DeployError::DeviceDegraded {
            device: DeviceId::new("r1"),
            reason: "restore failed".into(),
        };
        assert!(degraded.is_fatal());
        assert!(!degraded.is_retryable());

        let locked = DeployError::from(RepositoryError::Locked {
            path: PathBuf::from("/var/lib/netgate"),
        });
        assert!(locked.is_retryable());
        assert!(locked.to_string().contains("/var/lib/netgate is in use"));
    }
}
