//! Deployment records
//!
//! A [`DeploymentRecord`] tracks one candidate through the deployment state
//! machine. Every mutation is checked against
//! [`state_machine`](crate::state_machine); once a record is terminal it
//! rejects all further changes.

use crate::device::DeviceId;
use crate::diff::DiffRecord;
use crate::issue::ValidationIssue;
use crate::snapshot::ConfigurationSnapshot;
use crate::state_machine::{validate_transition, TransitionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique deployment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(pub Ulid);

impl DeploymentId {
    /// Generate new deployment ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for DeploymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeploymentId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Deployment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    /// Created, nothing checked yet
    Draft,
    /// No error-severity issues
    Validated,
    /// Diff against current attached
    Diffed,
    /// Preview produced
    DryRun,
    /// Candidate written, backup held
    Deploying,
    /// Waiting on the health probe
    HealthCheck,
    /// Candidate is the device's current config
    Committed,
    /// Backup restored
    RolledBack,
    /// Stopped without a successful outcome
    Failed,
}

impl DeploymentState {
    /// Terminal states accept no further transitions
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack | Self::Failed)
    }

    /// Whether the device may have been touched in this state
    #[inline]
    #[must_use]
    pub fn has_pushed(self) -> bool {
        matches!(self, Self::Deploying | Self::HealthCheck)
    }

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Validated => "VALIDATED",
            Self::Diffed => "DIFFED",
            Self::DryRun => "DRY_RUN",
            Self::Deploying => "DEPLOYING",
            Self::HealthCheck => "HEALTH_CHECK",
            Self::Committed => "COMMITTED",
            Self::RolledBack => "ROLLED_BACK",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Candidate kept
    Committed,
    /// Backup restored
    RolledBack,
    /// Failed
    Failed,
}

impl Outcome {
    fn from_state(state: DeploymentState) -> Option<Self> {
        match state {
            DeploymentState::Committed => Some(Self::Committed),
            DeploymentState::RolledBack => Some(Self::RolledBack),
            DeploymentState::Failed => Some(Self::Failed),
            _ => None,
        }
    }
}

/// What a record does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordKind {
    /// Push a candidate
    Deploy,
    /// Restore the backup of an earlier committed record
    ManualRollback {
        /// The committed record being reverted
        of: DeploymentId,
    },
}

/// A recorded state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Previous state; `None` for record creation
    pub from: Option<DeploymentState>,
    /// New state
    pub to: DeploymentState,
    /// When it happened
    pub at: DateTime<Utc>,
    /// Free-form note
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// Flags fixed at record creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOptions {
    /// Stop after the preview
    pub dry_run: bool,
    /// Health-check and restore on failure
    pub auto_rollback: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            auto_rollback: true,
        }
    }
}

/// One deployment attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    id: DeploymentId,
    kind: RecordKind,
    device: DeviceId,
    candidate: ConfigurationSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backup: Option<ConfigurationSnapshot>,
    state: DeploymentState,
    transitions: Vec<Transition>,
    #[serde(default)]
    issues: Vec<ValidationIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diff: Option<DiffRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    options: DeployOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outcome: Option<Outcome>,
}

impl DeploymentRecord {
    /// New deploy record in `DRAFT`
    #[must_use]
    pub fn deploy(device: DeviceId, candidate: ConfigurationSnapshot, options: DeployOptions) -> Self {
        Self::create(RecordKind::Deploy, device, candidate, options)
    }

    /// New manual rollback record in `DRAFT`; `target` is the snapshot to
    /// restore and becomes the record's candidate.
    #[must_use]
    pub fn manual_rollback(of: DeploymentId, device: DeviceId, target: ConfigurationSnapshot) -> Self {
        Self::create(
            RecordKind::ManualRollback { of },
            device,
            target,
            DeployOptions {
                dry_run: false,
                auto_rollback: false,
            },
        )
    }

    fn create(
        kind: RecordKind,
        device: DeviceId,
        candidate: ConfigurationSnapshot,
        options: DeployOptions,
    ) -> Self {
        Self {
            id: DeploymentId::new(),
            kind,
            device,
            candidate,
            backup: None,
            state: DeploymentState::Draft,
            transitions: vec![Transition {
                from: None,
                to: DeploymentState::Draft,
                at: Utc::now(),
                note: String::new(),
            }],
            issues: Vec::new(),
            diff: None,
            preview: None,
            failure: None,
            options,
            outcome: None,
        }
    }

    /// Identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> DeploymentId {
        self.id
    }

    /// Kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Target device
    #[inline]
    #[must_use]
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Candidate snapshot
    #[inline]
    #[must_use]
    pub fn candidate(&self) -> &ConfigurationSnapshot {
        &self.candidate
    }

    /// Backup captured when entering `DEPLOYING`
    #[inline]
    #[must_use]
    pub fn backup(&self) -> Option<&ConfigurationSnapshot> {
        self.backup.as_ref()
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// Transition log, oldest first
    #[inline]
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Attached issues
    #[inline]
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Attached diff
    #[inline]
    #[must_use]
    pub fn diff(&self) -> Option<&DiffRecord> {
        self.diff.as_ref()
    }

    /// Dry-run preview
    #[inline]
    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    /// Failure description
    #[inline]
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Creation flags
    #[inline]
    #[must_use]
    pub fn options(&self) -> DeployOptions {
        self.options
    }

    /// Terminal outcome
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Whether the record is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Creation time
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.transitions
            .first()
            .map_or_else(Utc::now, |t| t.at)
    }

    fn ensure_open(&self) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            Err(TransitionError::AlreadyTerminal(self.state))
        } else {
            Ok(())
        }
    }

    /// Move to `to`, validated against the transition table
    pub fn transition(
        &mut self,
        to: DeploymentState,
        note: impl Into<String>,
    ) -> Result<(), TransitionError> {
        validate_transition(&self.kind, self.state, to)?;
        self.transitions.push(Transition {
            from: Some(self.state),
            to,
            at: Utc::now(),
            note: note.into(),
        });
        self.state = to;
        self.outcome = Outcome::from_state(to);
        Ok(())
    }

    /// Record a failure reason and move to `FAILED`
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        let reason = reason.into();
        validate_transition(&self.kind, self.state, DeploymentState::Failed)?;
        self.failure = Some(reason.clone());
        self.transition(DeploymentState::Failed, reason)
    }

    /// Attach checker findings
    pub fn attach_issues(&mut self, issues: Vec<ValidationIssue>) -> Result<(), TransitionError> {
        self.ensure_open()?;
        self.issues = issues;
        Ok(())
    }

    /// Attach the diff against current
    pub fn attach_diff(&mut self, diff: DiffRecord) -> Result<(), TransitionError> {
        self.ensure_open()?;
        self.diff = Some(diff);
        Ok(())
    }

    /// Attach the dry-run preview
    pub fn attach_preview(&mut self, preview: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_open()?;
        self.preview = Some(preview.into());
        Ok(())
    }

    /// Attach the backup of the device's current snapshot
    pub fn attach_backup(&mut self, backup: ConfigurationSnapshot) -> Result<(), TransitionError> {
        self.ensure_open()?;
        self.backup = Some(backup);
        Ok(())
    }

    /// Note a problem without changing state (e.g. a rollback that could not be
    /// written before the record is failed)
    pub fn note_failure(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_open()?;
        self.failure = Some(reason.into());
        Ok(())
    }
}
