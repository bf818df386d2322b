use netgate_model::{
    allowed_transitions, validate_transition, DeploymentId, DeploymentState, RecordKind,
    TransitionError,
};
use proptest::prelude::*;

const ALL: [DeploymentState; 9] = [
    DeploymentState::Draft,
    DeploymentState::Validated,
    DeploymentState::Diffed,
    DeploymentState::DryRun,
    DeploymentState::Deploying,
    DeploymentState::HealthCheck,
    DeploymentState::Committed,
    DeploymentState::RolledBack,
    DeploymentState::Failed,
];

fn any_state() -> impl Strategy<Value = DeploymentState> {
    (0..ALL.len()).prop_map(|i| ALL[i])
}

fn any_kind() -> impl Strategy<Value = RecordKind> {
    prop_oneof![
        Just(RecordKind::Deploy),
        Just(RecordKind::ManualRollback {
            of: DeploymentId::new()
        }),
    ]
}

proptest! {
    #[test]
    fn prop_validate_agrees_with_table(kind in any_kind(), from in any_state(), to in any_state()) {
        let allowed = allowed_transitions(&kind, from).contains(&to);
        prop_assert_eq!(validate_transition(&kind, from, to).is_ok(), allowed);
    }

    #[test]
    fn prop_terminal_states_are_sinks(kind in any_kind(), from in any_state(), to in any_state()) {
        if from.is_terminal() {
            prop_assert_eq!(
                validate_transition(&kind, from, to),
                Err(TransitionError::AlreadyTerminal(from))
            );
        }
    }

    #[test]
    fn prop_every_open_state_can_fail(kind in any_kind(), from in any_state()) {
        if !from.is_terminal() && !allowed_transitions(&kind, from).is_empty() {
            prop_assert!(validate_transition(&kind, from, DeploymentState::Failed).is_ok());
        }
    }
}

#[test]
fn test_dry_run_reentry() {
    assert!(validate_transition(&RecordKind::Deploy, DeploymentState::DryRun, DeploymentState::DryRun).is_ok());
}

#[test]
fn test_commit_without_health_check() {
    assert!(validate_transition(
        &RecordKind::Deploy,
        DeploymentState::Deploying,
        DeploymentState::Committed
    )
    .is_ok());
}

#[test]
fn test_rollback_requires_push() {
    for from in [
        DeploymentState::Draft,
        DeploymentState::Validated,
        DeploymentState::Diffed,
        DeploymentState::DryRun,
    ] {
        assert!(validate_transition(&RecordKind::Deploy, from, DeploymentState::RolledBack).is_err());
    }
}
