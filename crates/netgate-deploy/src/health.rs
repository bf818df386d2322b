//! Post-push health probing

use netgate_model::Device;
use serde::{Deserialize, Serialize};

/// What a probe observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthSignal {
    /// Device is behaving
    Healthy,
    /// Device is not behaving
    Unhealthy {
        /// Observation
        reason: String,
    },
}

impl HealthSignal {
    /// Unhealthy signal
    #[must_use]
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self::Unhealthy {
            reason: reason.into(),
        }
    }

    /// Whether the signal is healthy
    #[inline]
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// The probe itself could not run
#[derive(Debug, Clone, thiserror::Error)]
#[error("health probe failed: {0}")]
pub struct ProbeError(pub String);

/// Health check run after a push
///
/// The device passed in already carries the pushed candidate as its current
/// snapshot. Errors count as unhealthy.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe the device
    async fn check(&self, device: &Device) -> Result<HealthSignal, ProbeError>;
}
