use netgate_analysis::StaticAnalysisEngine;
use netgate_audit::ComplianceAuditor;
use netgate_deploy::{HealthProbe, Repository, RepositoryError};
use netgate_model::DeviceId;
use netgate_server::{
    bootstrap, serve_lines, BootstrapError, NetgateConfig, ToolCall, ToolResponse, ToolService,
    ToolStatus,
};
use netgate_test_utils::*;
use netgate_validator::ConfigValidator;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

fn service(probe: Arc<dyn HealthProbe>) -> (ToolService, Arc<netgate_deploy::InMemoryRepository>) {
    let repo = seeded_repository();
    let orchestrator = Arc::new(orchestrator(repo.clone(), probe));
    let service = ToolService::new(
        Arc::new(ConfigValidator::default()),
        StaticAnalysisEngine::default(),
        orchestrator,
        Arc::new(ComplianceAuditor::with_builtin()),
    );
    (service, repo)
}

async fn call(service: &ToolService, tool: &str, arguments: Value) -> ToolResponse {
    service
        .dispatch(ToolCall {
            tool: tool.to_string(),
            arguments,
        })
        .await
}

fn current(repo: &dyn Repository, device: &str) -> String {
    repo.device(&DeviceId::new(device))
        .unwrap()
        .current()
        .content()
        .to_string()
}

#[tokio::test]
async fn netplan_without_network_is_blocked() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let resp = call(
        &svc,
        "validate_host_config",
        json!({ "content": NETPLAN_MISSING_NETWORK, "dialect": "netplan" }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::BlockedByValidation);
    assert_eq!(resp.status.exit_code(), 2);
    let data = resp.data.unwrap();
    assert_eq!(data["valid"], json!(false));
    assert!(data["issues"][0]["message"].as_str().unwrap().contains("network"));

    let resp = call(
        &svc,
        "validate_host_config",
        json!({ "content": NETPLAN_CANDIDATE, "dialect": "netplan" }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::Success);
}

#[tokio::test]
async fn device_dialect_is_refused_by_host_validation() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let resp = call(
        &svc,
        "validate_host_config",
        json!({ "content": EDGE_RUNNING, "dialect": "cisco_ios" }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::Failed);
    assert!(resp.message.contains("verify_device_config"));
}

#[tokio::test]
async fn verify_device_config_reports_undefined_acl() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let resp = call(
        &svc,
        "verify_device_config",
        json!({ "content": EDGE_UNDEFINED_ACL, "hostname": EDGE_ROUTER, "platform": "cisco_ios" }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::BlockedByValidation);

    let resp = call(
        &svc,
        "verify_device_config",
        json!({ "content": EDGE_CANDIDATE, "hostname": EDGE_ROUTER, "platform": "cisco_ios" }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::Success);
    assert_eq!(resp.data.unwrap()["status"], json!("success"));
}

#[tokio::test]
async fn diff_carries_unified_text() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let resp = call(
        &svc,
        "get_config_diff",
        json!({ "device": LINUX_HOST, "candidate": NETPLAN_CANDIDATE }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::Success);
    let data = resp.data.unwrap();
    let unified = data["unified"].as_str().unwrap();
    assert!(unified.contains("running-config@host-01"));
    assert!(unified.contains("candidate-config"));
    assert!(data["added"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn dry_run_is_the_default_and_changes_nothing() {
    let (svc, repo) = service(Arc::new(AlwaysUnhealthy("unused".into())));
    let resp = call(
        &svc,
        "deploy_config",
        json!({ "device": LINUX_HOST, "candidate": NETPLAN_CANDIDATE }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::Success);
    assert!(resp.message.contains(LINUX_HOST));
    assert_eq!(resp.data.unwrap()["state"], json!("DRY_RUN"));
    assert_eq!(current(repo.as_ref(), LINUX_HOST), NETPLAN_RUNNING);
}

#[tokio::test]
async fn unhealthy_push_maps_to_rolled_back() {
    let (svc, repo) = service(Arc::new(ContentMarkerProbe::default()));
    let resp = call(
        &svc,
        "deploy_config",
        json!({
            "device": LINUX_HOST,
            "candidate": NETPLAN_BAD_GATEWAY,
            "dry_run": false,
            "auto_rollback": true,
        }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::RolledBack);
    assert_eq!(resp.status.exit_code(), 3);
    assert!(resp.message.contains("health check failed"));
    let data = resp.data.unwrap();
    assert_eq!(data["state"], json!("ROLLED_BACK"));
    assert_eq!(data["outcome"], json!("rolled_back"));
    assert_eq!(current(repo.as_ref(), LINUX_HOST), NETPLAN_RUNNING);
}

#[tokio::test]
async fn blocked_deploy_maps_to_blocked_by_validation() {
    let (svc, repo) = service(Arc::new(AlwaysHealthy));
    let resp = call(
        &svc,
        "deploy_config",
        json!({ "device": LINUX_HOST, "candidate": NETPLAN_MISSING_NETWORK, "dry_run": false }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::BlockedByValidation);
    assert!(resp.message.contains("validation failed"));
    assert_eq!(current(repo.as_ref(), LINUX_HOST), NETPLAN_RUNNING);
}

#[tokio::test]
async fn commit_then_rollback_restores_previous() {
    let (svc, repo) = service(Arc::new(AlwaysHealthy));
    let resp = call(
        &svc,
        "deploy_config",
        json!({ "device": LINUX_HOST, "candidate": NETPLAN_CANDIDATE, "dry_run": false }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::Success);
    let id = resp.data.unwrap()["id"].as_str().unwrap().to_string();
    assert_eq!(current(repo.as_ref(), LINUX_HOST), NETPLAN_CANDIDATE);

    let shown = call(&svc, "get_deployment", json!({ "id": id })).await;
    assert_eq!(shown.status, ToolStatus::Success);
    assert!(shown.message.contains("COMMITTED"));

    let resp = call(&svc, "rollback", json!({ "device": LINUX_HOST })).await;
    assert_eq!(resp.status, ToolStatus::Success);
    assert!(resp.message.contains(&id));
    assert_eq!(current(repo.as_ref(), LINUX_HOST), NETPLAN_RUNNING);

    let history = call(&svc, "device_history", json!({ "device": LINUX_HOST })).await;
    assert_eq!(history.data.unwrap().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rollback_without_commits_fails() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let resp = call(&svc, "rollback", json!({ "device": EDGE_ROUTER, "revision": "last" })).await;
    assert_eq!(resp.status, ToolStatus::Failed);
    assert!(resp.message.contains("no committed revision"));

    let resp = call(&svc, "rollback", json!({ "device": EDGE_ROUTER, "revision": "yesterday" })).await;
    assert_eq!(resp.status, ToolStatus::Failed);
    assert!(resp.message.contains("invalid revision"));
}

#[tokio::test]
async fn compliance_and_vulnerability_tools() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let config = "hostname r1\nntp server 192.0.2.10\nno ip http server\n";
    let resp = call(&svc, "check_compliance", json!({ "content": config })).await;
    assert_eq!(resp.status, ToolStatus::Success);
    assert_eq!(resp.message, "1 violation(s) of 'golden'");
    let violations = resp.data.unwrap()["violations"].clone();
    assert_eq!(violations.as_array().unwrap().len(), 1);
    assert!(violations[0]["message"]
        .as_str()
        .unwrap()
        .contains("service password-encryption"));

    let resp = call(&svc, "check_compliance", json!({ "content": config, "ruleset": "pci" })).await;
    assert_eq!(resp.status, ToolStatus::Failed);

    let resp = call(&svc, "scan_vulnerabilities", json!({ "version": "16.03.01" })).await;
    assert_eq!(resp.status, ToolStatus::Success);
    assert_eq!(resp.data.unwrap()[0]["advisory"]["id"], json!("CVE-2023-1234"));

    let resp = call(&svc, "scan_vulnerabilities", json!({ "version": "4.21.0F" })).await;
    assert!(resp.message.starts_with("no known advisories"));

    let resp = call(&svc, "scan_vulnerabilities", json!({ "version": "0.0.1" })).await;
    assert!(resp.message.contains("unknown version"));
    assert_eq!(resp.data.unwrap()[0]["kind"], json!("unknown_version"));
}

#[tokio::test]
async fn unknown_tools_and_bad_arguments_fail() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let resp = call(&svc, "reboot", json!({})).await;
    assert_eq!(resp.status, ToolStatus::Failed);
    assert!(resp.message.contains("unknown tool"));

    let resp = call(&svc, "deploy_config", json!({ "device": LINUX_HOST })).await;
    assert_eq!(resp.status, ToolStatus::Failed);
    assert!(resp.message.contains("invalid arguments for deploy_config"));

    let resp = call(&svc, "get_deployment", json!({ "id": "not-a-ulid" })).await;
    assert_eq!(resp.status, ToolStatus::Failed);
}

#[tokio::test]
async fn plan_and_listing_tools() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let resp = call(&svc, "plan_deployment", json!({ "device": EDGE_ROUTER })).await;
    assert_eq!(resp.status, ToolStatus::Success);
    assert!(resp.message.contains("verify_device_config"));
    assert!(resp.message.contains("dry_run=true"));
    assert_eq!(resp.data.unwrap()["steps"].as_array().unwrap().len(), 7);

    let resp = call(&svc, "list_devices", Value::Null).await;
    assert_eq!(resp.status, ToolStatus::Success);
    assert_eq!(resp.message, "3 device(s), 0 degraded");

    let resp = call(&svc, "clear_degraded", json!({ "device": "nowhere" })).await;
    assert_eq!(resp.status, ToolStatus::Failed);
}

#[tokio::test]
async fn serve_loop_answers_line_by_line() {
    let (svc, _) = service(Arc::new(AlwaysHealthy));
    let input = format!(
        "{}\n\nnot json\n{}\n",
        json!({ "tool": "scan_vulnerabilities", "arguments": { "version": "16.03.01" } }),
        json!({ "tool": "list_devices" }),
    );
    let mut output = Vec::new();
    serve_lines(&svc, input.as_bytes(), &mut output).await.unwrap();

    let responses: Vec<ToolResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].status, ToolStatus::Success);
    assert_eq!(responses[1].status, ToolStatus::Failed);
    assert!(responses[1].message.starts_with("invalid tool call"));
    assert_eq!(responses[2].message, "3 device(s), 0 degraded");
}

fn write_inventory(dir: &Path, core_reachable: bool) -> NetgateConfig {
    std::fs::write(dir.join("edge-01.cfg"), EDGE_RUNNING).unwrap();
    std::fs::write(dir.join("mx-01.conf"), JUNOS_RUNNING).unwrap();
    let inventory = format!(
        "\
devices:
  - name: edge-01
    dialect: cisco_ios
    os_version: \"16.03.01\"
    config_file: edge-01.cfg
    interfaces:
      - {{ name: GigabitEthernet0/0, up: true }}
  - name: mx-01
    dialect: junos
    config_file: mx-01.conf
    reachable: {core_reachable}
links:
  - [edge-01, mx-01]
"
    );
    std::fs::write(dir.join("inventory.yaml"), inventory).unwrap();
    NetgateConfig {
        state_dir: dir.join("state"),
        inventory: Some(dir.join("inventory.yaml")),
        ..NetgateConfig::default()
    }
}

#[tokio::test]
async fn bootstrap_seeds_inventory_and_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inventory(dir.path(), true);

    let server = bootstrap(&config).unwrap();
    assert!(server.recovery.is_empty());
    let resp = call(
        &server.service,
        "deploy_config",
        json!({ "device": EDGE_ROUTER, "candidate": EDGE_CANDIDATE, "dry_run": false }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::Success, "{}", resp.message);
    drop(server);

    let server = bootstrap(&config).unwrap();
    let edge = server
        .service
        .orchestrator()
        .device(&DeviceId::new(EDGE_ROUTER))
        .unwrap();
    assert_eq!(edge.current().content(), EDGE_CANDIDATE);
    assert_eq!(edge.os_version(), Some("16.03.01"));
}

#[tokio::test]
async fn second_process_cannot_share_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inventory(dir.path(), true);

    let running = bootstrap(&config).unwrap();
    let err = bootstrap(&config).unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Repository(RepositoryError::Locked { .. })
    ));
    assert!(err.to_string().contains("is in use by another netgate process"), "{err}");

    drop(running);
    assert!(bootstrap(&config).is_ok());
}

#[tokio::test]
async fn unreachable_neighbour_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inventory(dir.path(), false);

    let server = bootstrap(&config).unwrap();
    let resp = call(
        &server.service,
        "deploy_config",
        json!({ "device": EDGE_ROUTER, "candidate": EDGE_CANDIDATE, "dry_run": false }),
    )
    .await;
    assert_eq!(resp.status, ToolStatus::RolledBack);
    assert!(resp.message.contains("mx-01"));
    let edge = server
        .service
        .orchestrator()
        .device(&DeviceId::new(EDGE_ROUTER))
        .unwrap();
    assert_eq!(edge.current().content(), EDGE_RUNNING);
}
