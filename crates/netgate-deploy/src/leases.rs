//! Per-device leases
//!
//! At most one real deployment or rollback may hold a device. A second
//! request is rejected immediately, never queued.

use crate::error::DeployError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use netgate_model::{DeploymentId, DeviceId};
use std::sync::Arc;
use tracing::debug;

/// Lease table
#[derive(Debug, Clone, Default)]
pub struct DeviceLeases {
    held: Arc<DashMap<DeviceId, DeploymentId>>,
}

impl DeviceLeases {
    /// Empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease on `device` for `holder`
    pub fn try_acquire(&self, device: &DeviceId, holder: DeploymentId) -> Result<DeviceLease, DeployError> {
        match self.held.entry(device.clone()) {
            Entry::Occupied(existing) => Err(DeployError::DeploymentInProgress {
                device: device.clone(),
                holder: *existing.get(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(holder);
                debug!(%device, %holder, "lease acquired");
                Ok(DeviceLease {
                    held: Arc::clone(&self.held),
                    device: device.clone(),
                    holder,
                })
            }
        }
    }

    /// Whether any lease is held on `device`
    #[must_use]
    pub fn is_held(&self, device: &DeviceId) -> bool {
        self.held.contains_key(device)
    }

    /// Number of held leases
    #[must_use]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// No leases held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Held lease; released on drop
#[derive(Debug)]
pub struct DeviceLease {
    held: Arc<DashMap<DeviceId, DeploymentId>>,
    device: DeviceId,
    holder: DeploymentId,
}

impl DeviceLease {
    /// Leased device
    #[inline]
    #[must_use]
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Record holding the lease
    #[inline]
    #[must_use]
    pub fn holder(&self) -> DeploymentId {
        self.holder
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.held.remove_if(&self.device, |_, holder| *holder == self.holder);
        debug!(device = %self.device, holder = %self.holder, "lease released");
    }
}
