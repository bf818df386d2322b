//! Deployment state machine
//!
//! The transition table is the single source of truth for which state changes
//! a [`DeploymentRecord`](crate::DeploymentRecord) may make.

use crate::deployment::{DeploymentState, RecordKind};

/// Rejected state change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The table has no edge `from -> to`
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: DeploymentState,
        /// Requested state
        to: DeploymentState,
    },

    /// Terminal records are immutable
    #[error("record is terminal ({0}) and cannot change")]
    AlreadyTerminal(DeploymentState),
}

/// Validate a state transition for a record kind.
pub fn validate_transition(
    kind: &RecordKind,
    from: DeploymentState,
    to: DeploymentState,
) -> Result<(), TransitionError> {
    if from.is_terminal() {
        return Err(TransitionError::AlreadyTerminal(from));
    }
    if allowed_transitions(kind, from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

/// States reachable in one step.
pub fn allowed_transitions(kind: &RecordKind, from: DeploymentState) -> Vec<DeploymentState> {
    use DeploymentState::*;

    if let RecordKind::ManualRollback { .. } = kind {
        return match from {
            Draft => vec![RolledBack, Failed],
            _ => vec![],
        };
    }

    match from {
        Draft => vec![Validated, Failed],
        Validated => vec![Diffed, Failed],
        Diffed => vec![DryRun, Failed],
        DryRun => vec![DryRun, Deploying, Failed],
        Deploying => vec![HealthCheck, Committed, RolledBack, Failed],
        HealthCheck => vec![Committed, RolledBack, Failed],
        Committed | RolledBack | Failed => vec![],
    }
}
