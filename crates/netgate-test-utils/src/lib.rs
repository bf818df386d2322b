//! Testing utilities for the netgate workspace
//!
//! Sample configurations, seeded repositories, scripted health probes and a
//! repository that injects write faults.

#![allow(missing_docs)]

use async_trait::async_trait;
use netgate_deploy::{
    DeployConfig, DeploymentOrchestrator, HealthProbe, HealthSignal, InMemoryRepository,
    ProbeError, Repository, RepositoryError,
};
use netgate_model::{
    ConfigurationSnapshot, ContentHash, DeploymentId, DeploymentRecord, DeploymentState, Device,
    DeviceId, Dialect,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const EDGE_ROUTER: &str = "edge-01";
pub const LINUX_HOST: &str = "host-01";
pub const CORE_ROUTER: &str = "mx-01";

pub const EDGE_RUNNING: &str = "\
hostname edge-01
version 16.03.01
!
service password-encryption
ntp server 192.0.2.10
no ip http server
!
interface GigabitEthernet0/0
 ip address 203.0.113.2 255.255.255.252
 ip access-group EDGE-IN in
!
ip access-list extended EDGE-IN
 permit tcp any host 203.0.113.2 eq 22
 deny ip any any log
!
end
";

pub const EDGE_CANDIDATE: &str = "\
hostname edge-01
version 16.03.01
!
service password-encryption
ntp server 192.0.2.10
ntp server 192.0.2.11
no ip http server
!
interface GigabitEthernet0/0
 ip address 203.0.113.2 255.255.255.252
 ip access-group EDGE-IN in
!
ip access-list extended EDGE-IN
 permit tcp any host 203.0.113.2 eq 22
 permit udp any host 203.0.113.2 eq 123
 deny ip any any log
!
end
";

/// Candidate referencing an ACL that is never defined
pub const EDGE_UNDEFINED_ACL: &str = "\
hostname edge-01
!
interface GigabitEthernet0/0
 ip address 203.0.113.2 255.255.255.252
 ip access-group EDGE-MISSING in
!
end
";

pub const NETPLAN_RUNNING: &str = "\
network:
  version: 2
  renderer: networkd
  ethernets:
    eth0:
      dhcp4: true
";

pub const NETPLAN_CANDIDATE: &str = "\
network:
  version: 2
  renderer: networkd
  ethernets:
    eth0:
      addresses:
        - 10.0.0.5/24
      gateway4: 10.0.0.1
      nameservers:
        addresses: [10.0.0.53]
";

/// Candidate whose marker makes [`ContentMarkerProbe`] report unhealthy
pub const NETPLAN_BAD_GATEWAY: &str = "\
network:
  version: 2
  ethernets:
    eth0:
      addresses:
        - 10.0.0.5/24
      gateway4: 10.0.0.254 # bad
";

/// Netplan text without the `network` key
pub const NETPLAN_MISSING_NETWORK: &str = "\
ethernets:
  eth0:
    dhcp4: true
";

pub const JUNOS_RUNNING: &str = "\
system {
    host-name mx-01;
}
policy-options {
    prefix-list LOOPBACKS {
        10.255.0.0/24;
    }
}
";

/// Devices used across integration tests
pub fn sample_devices() -> Vec<Device> {
    vec![
        Device::new(DeviceId::new(EDGE_ROUTER), Dialect::CiscoIos, EDGE_RUNNING)
            .with_os_version("16.03.01"),
        Device::new(DeviceId::new(LINUX_HOST), Dialect::Netplan, NETPLAN_RUNNING),
        Device::new(DeviceId::new(CORE_ROUTER), Dialect::Junos, JUNOS_RUNNING),
    ]
}

pub fn seeded_repository() -> Arc<InMemoryRepository> {
    Arc::new(InMemoryRepository::with_devices(sample_devices()).unwrap())
}

/// Orchestrator over `repo` with a short health timeout
pub fn orchestrator(repo: Arc<dyn Repository>, probe: Arc<dyn HealthProbe>) -> DeploymentOrchestrator {
    DeploymentOrchestrator::new(repo, probe)
        .with_config(DeployConfig::new().with_health_timeout(Duration::from_millis(200)))
}

pub fn real_deploy(auto_rollback: bool) -> netgate_model::DeployOptions {
    netgate_model::DeployOptions {
        dry_run: false,
        auto_rollback,
    }
}

#[derive(Debug, Default)]
pub struct AlwaysHealthy;

#[async_trait]
impl HealthProbe for AlwaysHealthy {
    async fn check(&self, _device: &Device) -> Result<HealthSignal, ProbeError> {
        Ok(HealthSignal::Healthy)
    }
}

#[derive(Debug)]
pub struct AlwaysUnhealthy(pub String);

#[async_trait]
impl HealthProbe for AlwaysUnhealthy {
    async fn check(&self, _device: &Device) -> Result<HealthSignal, ProbeError> {
        Ok(HealthSignal::unhealthy(self.0.clone()))
    }
}

/// Unhealthy when the pushed config contains `marker`
#[derive(Debug)]
pub struct ContentMarkerProbe {
    pub marker: String,
}

impl Default for ContentMarkerProbe {
    fn default() -> Self {
        Self {
            marker: "bad".to_string(),
        }
    }
}

#[async_trait]
impl HealthProbe for ContentMarkerProbe {
    async fn check(&self, device: &Device) -> Result<HealthSignal, ProbeError> {
        if device.current().content().contains(&self.marker) {
            Ok(HealthSignal::unhealthy(format!("config contains '{}'", self.marker)))
        } else {
            Ok(HealthSignal::Healthy)
        }
    }
}

/// Never answers
#[derive(Debug, Default)]
pub struct HangingProbe;

#[async_trait]
impl HealthProbe for HangingProbe {
    async fn check(&self, _device: &Device) -> Result<HealthSignal, ProbeError> {
        std::future::pending().await
    }
}

/// Probe that errors
#[derive(Debug, Default)]
pub struct BrokenProbe;

#[async_trait]
impl HealthProbe for BrokenProbe {
    async fn check(&self, _device: &Device) -> Result<HealthSignal, ProbeError> {
        Err(ProbeError("telemetry unreachable".to_string()))
    }
}

/// Healthy once released; signals when a check starts
#[derive(Debug, Default)]
pub struct GatedProbe {
    entered: Notify,
    release: Notify,
    calls: AtomicUsize,
}

impl GatedProbe {
    /// Wait until a check is in progress
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let the pending check finish
    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Number of checks started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for GatedProbe {
    async fn check(&self, _device: &Device) -> Result<HealthSignal, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(HealthSignal::Healthy)
    }
}

/// Delegates to an in-memory repository but rejects chosen writes
///
/// A write fails when it would store a record in the configured state: a
/// swap for [`FaultyRepository::failing_restore`], a plain save for
/// [`FaultyRepository::failing_save`].
#[derive(Debug)]
pub struct FaultyRepository {
    inner: InMemoryRepository,
    swap_fault: Option<DeploymentState>,
    save_fault: Option<DeploymentState>,
    rejected: AtomicUsize,
}

impl FaultyRepository {
    fn with_faults(
        devices: impl IntoIterator<Item = Device>,
        swap_fault: Option<DeploymentState>,
        save_fault: Option<DeploymentState>,
    ) -> Self {
        Self {
            inner: InMemoryRepository::with_devices(devices).unwrap(),
            swap_fault,
            save_fault,
            rejected: AtomicUsize::new(0),
        }
    }

    /// Rejects every swap that would store a `ROLLED_BACK` record
    pub fn failing_restore(devices: impl IntoIterator<Item = Device>) -> Self {
        Self::with_faults(devices, Some(DeploymentState::RolledBack), None)
    }

    /// Rejects every save of a record in `state`, as a full disk would
    pub fn failing_save(devices: impl IntoIterator<Item = Device>, state: DeploymentState) -> Self {
        Self::with_faults(devices, None, Some(state))
    }

    /// Number of writes rejected so far
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    fn reject(
        &self,
        fault: Option<DeploymentState>,
        record: &DeploymentRecord,
        message: &str,
    ) -> Result<(), RepositoryError> {
        if fault == Some(record.state()) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(RepositoryError::WriteRejected(message.to_string()));
        }
        Ok(())
    }
}

impl Repository for FaultyRepository {
    fn register(&self, device: Device) -> Result<(), RepositoryError> {
        self.inner.register(device)
    }

    fn device(&self, id: &DeviceId) -> Result<Device, RepositoryError> {
        self.inner.device(id)
    }

    fn devices(&self) -> Vec<Device> {
        self.inner.devices()
    }

    fn save_record(&self, record: &DeploymentRecord) -> Result<(), RepositoryError> {
        self.reject(self.save_fault, record, "disk full")?;
        self.inner.save_record(record)
    }

    fn record(&self, id: DeploymentId) -> Option<DeploymentRecord> {
        self.inner.record(id)
    }

    fn records_for(&self, device: &DeviceId) -> Vec<DeploymentRecord> {
        self.inner.records_for(device)
    }

    fn open_records(&self) -> Vec<DeploymentRecord> {
        self.inner.open_records()
    }

    fn swap_current(
        &self,
        device: &DeviceId,
        expected: &ContentHash,
        next: ConfigurationSnapshot,
        record: &DeploymentRecord,
    ) -> Result<ConfigurationSnapshot, RepositoryError> {
        self.reject(self.swap_fault, record, "device refused restore")?;
        self.inner.swap_current(device, expected, next, record)
    }

    fn mark_degraded(&self, device: &DeviceId, reason: &str) -> Result<(), RepositoryError> {
        self.inner.mark_degraded(device, reason)
    }

    fn clear_degraded(&self, device: &DeviceId) -> Result<(), RepositoryError> {
        self.inner.clear_degraded(device)
    }
}
