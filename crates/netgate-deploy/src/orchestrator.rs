//! Deployment orchestrator
//!
//! Drives a [`DeploymentRecord`] through the state machine:
//!
//! 1. `DRAFT -> VALIDATED`: host dialects through the validator, device
//!    dialects through static analysis
//! 2. `VALIDATED -> DIFFED`: diff against the device's current snapshot
//! 3. `DIFFED -> DRY_RUN`: preview, no mutation
//! 4. `DRY_RUN -> DEPLOYING`: backup and push in one repository swap
//! 5. `DEPLOYING -> HEALTH_CHECK -> COMMITTED | ROLLED_BACK`
//!
//! Dry runs never take a lease and are never stored. Real runs hold the
//! device's lease from creation to their terminal state.

use crate::config::DeployConfig;
use crate::error::{DeployError, RepositoryError};
use crate::health::{HealthProbe, HealthSignal};
use crate::journal::TransitionJournal;
use crate::leases::{DeviceLease, DeviceLeases};
use crate::repository::Repository;
use netgate_analysis::StaticAnalysisEngine;
use netgate_model::{
    diff, has_errors, ConfigurationSnapshot, DeployOptions, DeploymentId, DeploymentRecord,
    DeploymentState, Device, DeviceHealth, DeviceId, DiffRecord, Outcome, ValidationIssue,
};
use netgate_validator::ConfigValidator;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Which committed deployment a rollback reverts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Revision {
    /// Newest committed deployment of the device
    Last,
    /// A specific committed deployment
    Deployment(DeploymentId),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Last => f.write_str("last"),
            Self::Deployment(id) => fmt::Display::fmt(id, f),
        }
    }
}

/// A revision string that is neither `last` nor a deployment id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid revision '{0}': expected 'last' or a deployment id")]
pub struct InvalidRevision(pub String);

impl FromStr for Revision {
    type Err = InvalidRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("last") {
            return Ok(Self::Last);
        }
        s.parse()
            .map(Self::Deployment)
            .map_err(|_| InvalidRevision(s.to_string()))
    }
}

/// What [`DeploymentOrchestrator::recover`] did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Records restored from their backup
    pub rolled_back: Vec<DeploymentId>,
    /// Records closed as failed
    pub failed: Vec<DeploymentId>,
    /// Records skipped because their device is leased
    pub skipped: Vec<DeploymentId>,
}

impl RecoveryReport {
    /// Nothing needed recovery
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rolled_back.is_empty() && self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// The stateful core of netgate
pub struct DeploymentOrchestrator {
    repo: Arc<dyn Repository>,
    validator: Arc<ConfigValidator>,
    analysis: StaticAnalysisEngine,
    probe: Arc<dyn HealthProbe>,
    leases: DeviceLeases,
    journal: Arc<TransitionJournal>,
    config: DeployConfig,
}

impl fmt::Debug for DeploymentOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentOrchestrator")
            .field("analysis", &self.analysis)
            .field("leases", &self.leases.len())
            .field("journal", &self.journal.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DeploymentOrchestrator {
    /// Orchestrator with the default validator, local analysis and config
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            repo,
            validator: Arc::new(ConfigValidator::default()),
            analysis: StaticAnalysisEngine::default(),
            probe,
            leases: DeviceLeases::new(),
            journal: Arc::new(TransitionJournal::new()),
            config: DeployConfig::default(),
        }
    }

    /// With a validator
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<ConfigValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// With a static analysis engine
    #[must_use]
    pub fn with_analysis(mut self, analysis: StaticAnalysisEngine) -> Self {
        self.analysis = analysis;
        self
    }

    /// With configuration
    #[must_use]
    pub fn with_config(mut self, config: DeployConfig) -> Self {
        self.config = config;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Repository
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    /// Lease table
    #[inline]
    #[must_use]
    pub fn leases(&self) -> &DeviceLeases {
        &self.leases
    }

    /// Transition journal
    #[inline]
    #[must_use]
    pub fn journal(&self) -> &TransitionJournal {
        &self.journal
    }

    /// Register a device
    pub fn register_device(&self, device: Device) -> Result<(), DeployError> {
        info!(device = %device.id(), dialect = %device.dialect(), "device registered");
        Ok(self.repo.register(device)?)
    }

    /// Device by id
    pub fn device(&self, id: &DeviceId) -> Result<Device, DeployError> {
        self.repo.device(id).map_err(|e| match e {
            RepositoryError::UnknownDevice(id) => DeployError::UnknownDevice(id),
            other => DeployError::Repository(other),
        })
    }

    /// All devices
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.repo.devices()
    }

    /// Stored record by id
    pub fn record(&self, id: DeploymentId) -> Result<DeploymentRecord, DeployError> {
        self.repo.record(id).ok_or(DeployError::DeploymentNotFound(id))
    }

    /// Stored records of a device, oldest first
    pub fn history(&self, device: &DeviceId) -> Result<Vec<DeploymentRecord>, DeployError> {
        self.device(device)?;
        Ok(self.repo.records_for(device))
    }

    /// Clear a device's degraded marker after manual repair
    pub fn clear_degraded(&self, device: &DeviceId) -> Result<(), DeployError> {
        self.device(device)?;
        self.repo.clear_degraded(device)?;
        info!(%device, "degraded marker cleared");
        Ok(())
    }

    /// Diff a candidate against the device's current snapshot
    pub fn diff_against_current(&self, device: &DeviceId, candidate: &str) -> Result<DiffRecord, DeployError> {
        let device = self.device(device)?;
        Ok(diff(device.current().content(), candidate))
    }

    /// Unified rendering of a diff for `device`
    #[must_use]
    pub fn render_diff(&self, device: &DeviceId, diff: &DiffRecord) -> String {
        diff.to_unified(
            &self.config.running_label(device.as_str()),
            &self.config.candidate_label,
        )
    }

    /// Run a candidate through the state machine.
    ///
    /// `Ok` carries the record in whatever state it stopped: `DRY_RUN` for a
    /// preview, `FAILED` for blocked or unverifiable candidates, otherwise
    /// `COMMITTED` or `ROLLED_BACK`. `Err` means the request could not start.
    pub async fn deploy(
        &self,
        device_id: &DeviceId,
        candidate: &str,
        options: DeployOptions,
    ) -> Result<DeploymentRecord, DeployError> {
        let mut device = self.device(device_id)?;
        ensure_healthy(&device)?;

        let snapshot = ConfigurationSnapshot::candidate(candidate, device.dialect());
        let mut record = DeploymentRecord::deploy(device_id.clone(), snapshot, options);
        let persist = !options.dry_run;
        let _lease = if persist {
            let lease = self.claim(device_id, record.id())?;
            // diff, preview and push must see what the lease holder sees
            device = self.device(device_id)?;
            ensure_healthy(&device)?;
            self.repo.save_record(&record)?;
            self.journal_last(&record);
            Some(lease)
        } else {
            None
        };
        info!(
            deployment = %record.id(),
            device = %device_id,
            dry_run = options.dry_run,
            auto_rollback = options.auto_rollback,
            "deployment started"
        );

        let issues = match self.verify(&device, record.candidate()).await {
            Ok(issues) => issues,
            Err(e) => {
                error!(deployment = %record.id(), device = %device_id, error = %e, "verification unavailable");
                self.fail(&mut record, &e.to_string(), persist)?;
                return Ok(record);
            }
        };
        let blocked = has_errors(&issues);
        record.attach_issues(issues)?;
        if blocked {
            let errors = record.issues().iter().filter(|i| i.is_error()).count();
            self.fail(
                &mut record,
                &format!("validation failed with {errors} error(s)"),
                persist,
            )?;
            return Ok(record);
        }
        self.advance(&mut record, DeploymentState::Validated, "", persist)?;

        let changes = diff(device.current().content(), record.candidate().content());
        let note = format!("+{} -{}", changes.added(), changes.removed());
        record.attach_diff(changes)?;
        self.advance(&mut record, DeploymentState::Diffed, &note, persist)?;

        let preview = self.render_preview(&device, &record);
        record.attach_preview(preview)?;
        self.advance(&mut record, DeploymentState::DryRun, "", persist)?;
        if options.dry_run {
            return Ok(record);
        }

        self.push(&device, &mut record)?;
        if record.is_terminal() {
            return Ok(record);
        }

        if let Some(reason) = self.settle(&mut record, options.auto_rollback).await {
            warn!(deployment = %record.id(), device = %device_id, %reason, "rolling back");
            self.restore(&mut record, &reason)?;
        }
        Ok(record)
    }

    /// Carry a pushed record to `COMMITTED`.
    ///
    /// Returns why the push has to be undone instead: a failed health check,
    /// or a repository fault that kept the outcome from being recorded.
    async fn settle(&self, record: &mut DeploymentRecord, auto_rollback: bool) -> Option<String> {
        if !auto_rollback {
            return self
                .advance(record, DeploymentState::Committed, "committed without health check", true)
                .err()
                .map(|e| format!("commit not recorded: {e}"));
        }
        if let Err(e) = self.advance(record, DeploymentState::HealthCheck, "", true) {
            return Some(format!("health check not recorded: {e}"));
        }
        let pushed = match self.device(record.device()) {
            Ok(device) => device,
            Err(e) => return Some(format!("pushed device unreadable: {e}")),
        };
        if let Some(reason) = self.probe_health(&pushed).await {
            return Some(reason);
        }
        self.advance(record, DeploymentState::Committed, "health check passed", true)
            .err()
            .map(|e| format!("commit not recorded: {e}"))
    }

    /// Restore the backup held by a committed deployment.
    ///
    /// Creates a `manual_rollback` record that ends in `ROLLED_BACK`, or in
    /// `FAILED` if the repository rejects the write.
    pub fn rollback(&self, device_id: &DeviceId, revision: Revision) -> Result<DeploymentRecord, DeployError> {
        let device = self.device(device_id)?;
        ensure_healthy(&device)?;

        let history = self.repo.records_for(device_id);
        let committed = |r: &&DeploymentRecord| r.outcome() == Some(Outcome::Committed);
        let target = match revision {
            Revision::Last => history.iter().rev().find(committed),
            Revision::Deployment(id) => history.iter().filter(committed).find(|r| r.id() == id),
        };
        let Some(target) = target else {
            return Err(DeployError::NoCommittedRevision {
                device: device_id.clone(),
                detail: format!("revision {revision}"),
            });
        };
        let Some(backup) = target.backup().cloned() else {
            return Err(DeployError::NoCommittedRevision {
                device: device_id.clone(),
                detail: format!("deployment {} holds no backup", target.id()),
            });
        };

        let mut record = DeploymentRecord::manual_rollback(target.id(), device_id.clone(), backup.clone());
        let _lease = self.claim(device_id, record.id())?;
        self.repo.save_record(&record)?;
        self.journal_last(&record);

        let mut next = record.clone();
        next.attach_backup(device.current().as_backup())?;
        next.transition(
            DeploymentState::RolledBack,
            format!("restored backup of {}", target.id()),
        )?;
        match self
            .repo
            .swap_current(device_id, device.current().hash(), backup, &next)
        {
            Ok(_) => {
                record = next;
                self.journal_last(&record);
                warn!(
                    deployment = %record.id(),
                    device = %device_id,
                    reverted = %target.id(),
                    "manual rollback applied"
                );
            }
            Err(e) => {
                error!(deployment = %record.id(), device = %device_id, error = %e, "manual rollback failed");
                self.fail(&mut record, &format!("rollback write failed: {e}"), true)?;
            }
        }
        Ok(record)
    }

    /// Close every record left open by an interrupted process.
    ///
    /// Records that reached `DEPLOYING` are restored from their backup;
    /// earlier ones never touched the device and are failed.
    pub fn recover(&self) -> Result<RecoveryReport, DeployError> {
        let mut report = RecoveryReport::default();
        for mut record in self.repo.open_records() {
            let Ok(_lease) = self.leases.try_acquire(record.device(), record.id()) else {
                report.skipped.push(record.id());
                continue;
            };
            if record.state().has_pushed() {
                self.restore(&mut record, "interrupted after push")?;
            } else {
                self.fail(&mut record, "interrupted before push", true)?;
            }
            match record.outcome() {
                Some(Outcome::RolledBack) => report.rolled_back.push(record.id()),
                _ => report.failed.push(record.id()),
            }
        }
        if !report.is_empty() {
            info!(
                rolled_back = report.rolled_back.len(),
                failed = report.failed.len(),
                skipped = report.skipped.len(),
                "recovery finished"
            );
        }
        Ok(report)
    }

    fn claim(&self, device: &DeviceId, holder: DeploymentId) -> Result<DeviceLease, DeployError> {
        let lease = self.leases.try_acquire(device, holder)?;
        if let Some(open) = self
            .repo
            .records_for(device)
            .into_iter()
            .find(|r| !r.is_terminal() && r.id() != holder)
        {
            return Err(DeployError::DeploymentInProgress {
                device: device.clone(),
                holder: open.id(),
            });
        }
        Ok(lease)
    }

    async fn verify(
        &self,
        device: &Device,
        candidate: &ConfigurationSnapshot,
    ) -> Result<Vec<ValidationIssue>, DeployError> {
        let dialect = candidate.dialect();
        let Some(platform) = dialect.platform() else {
            return Ok(self.validator.validate(candidate.content(), dialect));
        };
        let report = self
            .analysis
            .verify(candidate.content(), device.id().as_str(), platform)
            .await;
        if let Some(message) = report.error_message() {
            return Err(DeployError::BackendUnavailable(message.to_string()));
        }
        Ok(report.to_validation_issues())
    }

    fn push(&self, device: &Device, record: &mut DeploymentRecord) -> Result<(), DeployError> {
        let mut next = record.clone();
        next.attach_backup(device.current().as_backup())?;
        next.transition(DeploymentState::Deploying, "backup captured")?;
        match self.repo.swap_current(
            device.id(),
            device.current().hash(),
            next.candidate().clone(),
            &next,
        ) {
            Ok(_) => {
                *record = next;
                self.journal_last(record);
                info!(
                    deployment = %record.id(),
                    device = %device.id(),
                    from = DeploymentState::DryRun.as_str(),
                    to = DeploymentState::Deploying.as_str(),
                    candidate = %record.candidate().hash().short(),
                    "candidate pushed"
                );
                Ok(())
            }
            Err(e) => {
                error!(deployment = %record.id(), device = %device.id(), error = %e, "push failed");
                self.fail(record, &format!("push failed: {e}"), true)
            }
        }
    }

    async fn probe_health(&self, device: &Device) -> Option<String> {
        let timeout = self.config.health_timeout();
        match tokio::time::timeout(timeout, self.probe.check(device)).await {
            Ok(Ok(HealthSignal::Healthy)) => None,
            Ok(Ok(HealthSignal::Unhealthy { reason })) => Some(format!("health check failed: {reason}")),
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("health check timed out after {}ms", timeout.as_millis())),
        }
    }

    /// Put the record's backup back as current, or fail and degrade
    fn restore(&self, record: &mut DeploymentRecord, reason: &str) -> Result<(), DeployError> {
        let Some(backup) = record.backup().cloned() else {
            self.degrade(record, reason, "no backup was captured")?;
            return Ok(());
        };
        let mut next = record.clone();
        next.transition(DeploymentState::RolledBack, reason)?;
        match self
            .repo
            .swap_current(record.device(), record.candidate().hash(), backup, &next)
        {
            Ok(_) => {
                *record = next;
                self.journal_last(record);
                warn!(
                    deployment = %record.id(),
                    device = %record.device(),
                    restored = %record.backup().map(|b| b.hash().short()).unwrap_or_default(),
                    "rolled back"
                );
                Ok(())
            }
            Err(e) => self.degrade(record, reason, &e.to_string()),
        }
    }

    fn degrade(&self, record: &mut DeploymentRecord, cause: &str, failure: &str) -> Result<(), DeployError> {
        let message = format!("rollback after '{cause}' failed: {failure}; device state unknown");
        error!(deployment = %record.id(), device = %record.device(), %message, "rollback failed");
        record.fail(&message)?;
        self.journal_last(record);
        if let Err(e) = self.repo.save_record(record) {
            error!(deployment = %record.id(), error = %e, "could not store failed record");
        }
        if let Err(e) = self.repo.mark_degraded(record.device(), &message) {
            error!(device = %record.device(), error = %e, "could not mark device degraded");
        }
        Ok(())
    }

    fn advance(
        &self,
        record: &mut DeploymentRecord,
        to: DeploymentState,
        note: &str,
        persist: bool,
    ) -> Result<(), DeployError> {
        let from = record.state();
        let mut next = record.clone();
        next.transition(to, note)?;
        if persist {
            self.repo.save_record(&next)?;
            self.journal_last(&next);
        }
        info!(deployment = %next.id(), device = %next.device(), %from, %to, "state transition");
        *record = next;
        Ok(())
    }

    fn fail(&self, record: &mut DeploymentRecord, reason: &str, persist: bool) -> Result<(), DeployError> {
        let from = record.state();
        record.fail(reason)?;
        warn!(deployment = %record.id(), device = %record.device(), %from, %reason, "deployment failed");
        if persist {
            self.journal_last(record);
            self.repo.save_record(record)?;
        }
        Ok(())
    }

    fn journal_last(&self, record: &DeploymentRecord) {
        if let Some(t) = record.transitions().last() {
            self.journal
                .append(record.id(), record.device(), t.from, t.to, &t.note);
        }
    }

    fn render_preview(&self, device: &Device, record: &DeploymentRecord) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "device: {} ({})", device.id(), device.dialect());
        let _ = writeln!(
            out,
            "current: {} -> candidate: {}",
            device.current().hash().short(),
            record.candidate().hash().short()
        );
        match record.diff() {
            Some(d) if !d.is_empty() => {
                let _ = writeln!(
                    out,
                    "changes: +{} -{} in {} hunk(s)",
                    d.added(),
                    d.removed(),
                    d.hunks().len()
                );
            }
            _ => {
                let _ = writeln!(out, "changes: none (deploying is a no-op)");
            }
        }
        for issue in record.issues() {
            let _ = writeln!(out, "{issue}");
        }
        if let Some(d) = record.diff().filter(|d| !d.is_empty()) {
            out.push('\n');
            out.push_str(&self.render_diff(device.id(), d));
        }
        out
    }
}

fn ensure_healthy(device: &Device) -> Result<(), DeployError> {
    if let DeviceHealth::Degraded { reason, .. } = device.health() {
        return Err(DeployError::DeviceDegraded {
            device: device.id().clone(),
            reason: reason.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::MockHealthProbe;
    use crate::repository::InMemoryRepository;
    use netgate_model::{ContentHash, Dialect};
    use std::sync::atomic::{AtomicBool, Ordering};

    const RUNNING: &str = "network:\n  version: 2\n  ethernets:\n    eth0:\n      dhcp4: true\n";
    const CANDIDATE: &str = "network:\n  version: 2\n  ethernets:\n    eth0:\n      addresses: [10.0.0.5/24]\n";

    fn orchestrator(probe: MockHealthProbe) -> DeploymentOrchestrator {
        let repo = InMemoryRepository::with_devices([Device::new(
            DeviceId::new("host-1"),
            Dialect::Netplan,
            RUNNING,
        )])
        .unwrap();
        DeploymentOrchestrator::new(Arc::new(repo), Arc::new(probe))
    }

    fn real(auto_rollback: bool) -> DeployOptions {
        DeployOptions {
            dry_run: false,
            auto_rollback,
        }
    }

    #[tokio::test]
    async fn dry_run_is_ephemeral() {
        let orch = orchestrator(MockHealthProbe::new());
        let id = DeviceId::new("host-1");

        let first = orch.deploy(&id, CANDIDATE, DeployOptions::default()).await.unwrap();
        let second = orch.deploy(&id, CANDIDATE, DeployOptions::default()).await.unwrap();

        assert_eq!(first.state(), DeploymentState::DryRun);
        assert_eq!(first.preview(), second.preview());
        assert!(first.preview().unwrap().contains("+++ candidate-config"));
        assert_eq!(orch.device(&id).unwrap().current().content(), RUNNING);
        assert!(orch.history(&id).unwrap().is_empty());
        assert!(orch.journal().is_empty());
    }

    #[tokio::test]
    async fn healthy_push_commits() {
        let mut probe = MockHealthProbe::new();
        probe
            .expect_check()
            .times(1)
            .returning(|_| Ok(HealthSignal::Healthy));
        let orch = orchestrator(probe);
        let id = DeviceId::new("host-1");

        let record = orch.deploy(&id, CANDIDATE, real(true)).await.unwrap();
        assert_eq!(record.outcome(), Some(Outcome::Committed));
        assert_eq!(record.backup().unwrap().content(), RUNNING);
        assert_eq!(orch.device(&id).unwrap().current().content(), CANDIDATE);
        assert_eq!(orch.record(record.id()).unwrap(), record);
        assert!(orch.journal().verify_integrity().is_ok());
        assert!(orch.leases().is_empty());
    }

    #[tokio::test]
    async fn without_auto_rollback_probe_is_skipped() {
        let mut probe = MockHealthProbe::new();
        probe.expect_check().never();
        let orch = orchestrator(probe);

        let record = orch
            .deploy(&DeviceId::new("host-1"), CANDIDATE, real(false))
            .await
            .unwrap();
        let states: Vec<_> = record.transitions().iter().map(|t| t.to).collect();
        assert_eq!(states.last(), Some(&DeploymentState::Committed));
        assert!(!states.contains(&DeploymentState::HealthCheck));
    }

    #[tokio::test]
    async fn invalid_candidate_is_blocked_before_push() {
        let mut probe = MockHealthProbe::new();
        probe.expect_check().never();
        let orch = orchestrator(probe);
        let id = DeviceId::new("host-1");

        let record = orch.deploy(&id, "ethernets: {}\n", real(true)).await.unwrap();
        assert_eq!(record.state(), DeploymentState::Failed);
        assert!(has_errors(record.issues()));
        assert!(record.backup().is_none());
        assert_eq!(orch.device(&id).unwrap().current().content(), RUNNING);
    }

    #[tokio::test]
    async fn rollback_without_commit() {
        let orch = orchestrator(MockHealthProbe::new());
        let err = orch.rollback(&DeviceId::new("host-1"), Revision::Last).unwrap_err();
        assert!(matches!(err, DeployError::NoCommittedRevision { .. }));
    }

    #[test]
    fn revision_parsing() {
        assert_eq!("last".parse::<Revision>().unwrap(), Revision::Last);
        assert_eq!(" LAST ".parse::<Revision>().unwrap(), Revision::Last);
        let id = DeploymentId::new();
        assert_eq!(
            id.to_string().parse::<Revision>().unwrap(),
            Revision::Deployment(id)
        );
        assert!("yesterday".parse::<Revision>().is_err());
    }

    /// Commits another revision the first time a device's records are read
    struct LateCommitRepository {
        inner: InMemoryRepository,
        landed: AtomicBool,
    }

    const LATE: &str = "network:\n  version: 2\n  ethernets:\n    eth0:\n      dhcp4: false\n";

    impl LateCommitRepository {
        fn land(&self, device: &DeviceId) {
            let current = self.inner.device(device).unwrap().current().clone();
            let mut other = DeploymentRecord::deploy(
                device.clone(),
                ConfigurationSnapshot::candidate(LATE, Dialect::Netplan),
                real(false),
            );
            for state in [DeploymentState::Validated, DeploymentState::Diffed, DeploymentState::DryRun] {
                other.transition(state, "").unwrap();
            }
            other.attach_backup(current.as_backup()).unwrap();
            other.transition(DeploymentState::Deploying, "").unwrap();
            other.transition(DeploymentState::Committed, "").unwrap();
            self.inner
                .swap_current(device, current.hash(), other.candidate().clone(), &other)
                .unwrap();
        }
    }

    impl Repository for LateCommitRepository {
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
            self.inner.save_record(record)
        }
        fn record(&self, id: DeploymentId) -> Option<DeploymentRecord> {
            self.inner.record(id)
        }
        fn records_for(&self, device: &DeviceId) -> Vec<DeploymentRecord> {
            if !self.landed.swap(true, Ordering::SeqCst) {
                self.land(device);
            }
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
            self.inner.swap_current(device, expected, next, record)
        }
        fn mark_degraded(&self, device: &DeviceId, reason: &str) -> Result<(), RepositoryError> {
            self.inner.mark_degraded(device, reason)
        }
        fn clear_degraded(&self, device: &DeviceId) -> Result<(), RepositoryError> {
            self.inner.clear_degraded(device)
        }
    }

    #[tokio::test]
    async fn push_builds_on_state_seen_after_claim() {
        let repo = Arc::new(LateCommitRepository {
            inner: InMemoryRepository::with_devices([Device::new(
                DeviceId::new("host-1"),
                Dialect::Netplan,
                RUNNING,
            )])
            .unwrap(),
            landed: AtomicBool::new(false),
        });
        let mut probe = MockHealthProbe::new();
        probe
            .expect_check()
            .times(1)
            .returning(|_| Ok(HealthSignal::Healthy));
        let orch = DeploymentOrchestrator::new(repo.clone(), Arc::new(probe));
        let id = DeviceId::new("host-1");

        let record = orch.deploy(&id, CANDIDATE, real(true)).await.unwrap();

        assert_eq!(record.outcome(), Some(Outcome::Committed), "{:?}", record.failure());
        assert_eq!(record.backup().unwrap().content(), LATE);
        assert!(record.preview().unwrap().contains("-      dhcp4: false"));
        assert_eq!(orch.device(&id).unwrap().current().content(), CANDIDATE);
    }

    #[tokio::test]
    async fn unknown_device() {
        let orch = orchestrator(MockHealthProbe::new());
        let err = orch
            .deploy(&DeviceId::new("nope"), CANDIDATE, DeployOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::UnknownDevice(_)));
    }
}
