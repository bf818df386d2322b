use netgate_model::{DeployOptions, DeploymentState, DeviceId};
use netgate_test_utils::*;
use proptest::prelude::*;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_dry_run_never_mutates(
        lines in prop::collection::vec("[a-z0-9 :./-]{0,40}", 0..30),
        host in prop::sample::select(vec![LINUX_HOST, EDGE_ROUTER, CORE_ROUTER]),
    ) {
        let candidate = lines.join("\n");
        let repo = seeded_repository();
        let orch = orchestrator(repo.clone(), Arc::new(AlwaysUnhealthy("unused".into())));
        let id = DeviceId::new(host);
        let before = netgate_deploy::Repository::device(repo.as_ref(), &id).unwrap();

        let record = runtime()
            .block_on(orch.deploy(&id, &candidate, DeployOptions::default()))
            .unwrap();

        prop_assert!(matches!(record.state(), DeploymentState::DryRun | DeploymentState::Failed));
        let after = netgate_deploy::Repository::device(repo.as_ref(), &id).unwrap();
        prop_assert_eq!(after, before);
        prop_assert!(orch.journal().is_empty());
    }
}
