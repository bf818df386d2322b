//! Managed devices

use crate::deployment::DeploymentId;
use crate::dialect::Dialect;
use crate::snapshot::ConfigurationSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device identity (hostname)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Create from hostname
    #[inline]
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self(hostname.into())
    }

    /// Hostname
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Operational marker for a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeviceHealth {
    /// Current snapshot is known-good
    Healthy,
    /// A restore failed; the running state is unknown until an operator
    /// intervenes
    Degraded {
        /// What went wrong
        reason: String,
        /// When the device was marked
        since: DateTime<Utc>,
    },
}

/// A managed device and its configuration pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    id: DeviceId,
    dialect: Dialect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    os_version: Option<String>,
    current: ConfigurationSnapshot,
    history: Vec<DeploymentId>,
    health: DeviceHealth,
}

impl Device {
    /// Register a device with its running configuration
    #[must_use]
    pub fn new(id: DeviceId, dialect: Dialect, running_config: impl Into<String>) -> Self {
        let current = ConfigurationSnapshot::live(running_config, dialect);
        Self {
            id,
            dialect,
            os_version: None,
            current,
            history: Vec::new(),
            health: DeviceHealth::Healthy,
        }
    }

    /// With OS version tag
    #[inline]
    #[must_use]
    pub fn with_os_version(mut self, version: impl Into<String>) -> Self {
        self.os_version = Some(version.into());
        self
    }

    /// Identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Configuration dialect
    #[inline]
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// OS version tag
    #[inline]
    #[must_use]
    pub fn os_version(&self) -> Option<&str> {
        self.os_version.as_deref()
    }

    /// Current snapshot
    #[inline]
    #[must_use]
    pub fn current(&self) -> &ConfigurationSnapshot {
        &self.current
    }

    /// Deployment ids, oldest first
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[DeploymentId] {
        &self.history
    }

    /// Health marker
    #[inline]
    #[must_use]
    pub fn health(&self) -> &DeviceHealth {
        &self.health
    }

    /// Whether a failed restore left the device in an unknown state
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.health, DeviceHealth::Degraded { .. })
    }

    /// Replace the current snapshot, returning the previous one.
    ///
    /// Repositories call this inside their atomic swap; nothing else should.
    pub fn replace_current(&mut self, next: ConfigurationSnapshot) -> ConfigurationSnapshot {
        std::mem::replace(&mut self.current, next)
    }

    /// Append a deployment to history (idempotent)
    pub fn record_deployment(&mut self, id: DeploymentId) {
        if !self.history.contains(&id) {
            self.history.push(id);
        }
    }

    /// Mark degraded
    pub fn mark_degraded(&mut self, reason: impl Into<String>) {
        self.health = DeviceHealth::Degraded {
            reason: reason.into(),
            since: Utc::now(),
        };
    }

    /// Clear a degraded marker after manual intervention
    pub fn clear_degraded(&mut self) {
        self.health = DeviceHealth::Healthy;
    }
}
