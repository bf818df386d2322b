//! Tool surface
//!
//! Every tool takes a request struct from [`crate::requests`] and returns a
//! [`ToolResponse`]. Nothing here returns `Err`: validation findings, backend
//! outages and refused requests all become a status plus a message.

use crate::requests::{
    CheckComplianceRequest, DeployConfigRequest, DeviceRequest, EmptyRequest,
    GetConfigDiffRequest, GetDeploymentRequest, RollbackRequest, ScanVulnerabilitiesRequest,
    ValidateHostConfigRequest, VerifyDeviceConfigRequest,
};
use netgate_analysis::StaticAnalysisEngine;
use netgate_audit::{ComplianceAuditor, Finding};
use netgate_deploy::{DeploymentOrchestrator, Revision};
use netgate_model::{
    DeployOptions, DeploymentId, DeploymentRecord, DeploymentState, DeviceId, Dialect, Platform,
    RecordKind,
};
use netgate_validator::ConfigValidator;
use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tool names, in listing order
pub const TOOLS: [&str; 12] = [
    "validate_host_config",
    "verify_device_config",
    "get_config_diff",
    "deploy_config",
    "rollback",
    "check_compliance",
    "scan_vulnerabilities",
    "get_deployment",
    "device_history",
    "list_devices",
    "clear_degraded",
    "plan_deployment",
];

/// Coarse result of a tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Done
    Success,
    /// Checkers found errors; nothing was changed
    BlockedByValidation,
    /// Pushed, found unhealthy, restored
    RolledBack,
    /// Could not be done
    Failed,
}

impl ToolStatus {
    /// Process exit code for the CLI
    #[inline]
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::BlockedByValidation => 2,
            Self::RolledBack => 3,
        }
    }
}

/// Result of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolResponse {
    /// Outcome
    pub status: ToolStatus,
    /// One-line summary, or the preview for dry runs
    pub message: String,
    /// Structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResponse {
    /// Response with a serialized payload
    pub fn with_data<T: Serialize>(status: ToolStatus, message: impl Into<String>, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                status,
                message: message.into(),
                data: Some(data),
            },
            Err(e) => Self::failed(format!("cannot encode response: {e}")),
        }
    }

    /// Failure without payload
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Failed,
            message: message.into(),
            data: None,
        }
    }
}

/// One line of the `serve` protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolCall {
    /// Tool name
    pub tool: String,
    /// Request struct for the tool
    #[serde(default)]
    pub arguments: Value,
}

/// Request schema per tool
#[must_use]
pub fn schemas() -> BTreeMap<&'static str, RootSchema> {
    BTreeMap::from([
        ("validate_host_config", schema_for!(ValidateHostConfigRequest)),
        ("verify_device_config", schema_for!(VerifyDeviceConfigRequest)),
        ("get_config_diff", schema_for!(GetConfigDiffRequest)),
        ("deploy_config", schema_for!(DeployConfigRequest)),
        ("rollback", schema_for!(RollbackRequest)),
        ("check_compliance", schema_for!(CheckComplianceRequest)),
        ("scan_vulnerabilities", schema_for!(ScanVulnerabilitiesRequest)),
        ("get_deployment", schema_for!(GetDeploymentRequest)),
        ("device_history", schema_for!(DeviceRequest)),
        ("list_devices", schema_for!(EmptyRequest)),
        ("clear_degraded", schema_for!(DeviceRequest)),
        ("plan_deployment", schema_for!(DeviceRequest)),
    ])
}

fn decode<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolResponse> {
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| ToolResponse::failed(format!("invalid arguments for {tool}: {e}")))
}

/// Tool front end over the engines
#[derive(Debug, Clone)]
pub struct ToolService {
    validator: Arc<ConfigValidator>,
    analysis: StaticAnalysisEngine,
    orchestrator: Arc<DeploymentOrchestrator>,
    auditor: Arc<ComplianceAuditor>,
}

impl ToolService {
    /// Service over shared engines
    #[must_use]
    pub fn new(
        validator: Arc<ConfigValidator>,
        analysis: StaticAnalysisEngine,
        orchestrator: Arc<DeploymentOrchestrator>,
        auditor: Arc<ComplianceAuditor>,
    ) -> Self {
        Self {
            validator,
            analysis,
            orchestrator,
            auditor,
        }
    }

    /// Orchestrator in use
    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<DeploymentOrchestrator> {
        &self.orchestrator
    }

    /// Route a call by tool name
    pub async fn dispatch(&self, call: ToolCall) -> ToolResponse {
        let ToolCall { tool, arguments } = call;
        debug!(%tool, "tool call");

        macro_rules! route {
            ($method:ident) => {
                match decode(&tool, arguments) {
                    Ok(req) => self.$method(req),
                    Err(resp) => resp,
                }
            };
            ($method:ident, await) => {
                match decode(&tool, arguments) {
                    Ok(req) => self.$method(req).await,
                    Err(resp) => resp,
                }
            };
        }

        let response = match tool.as_str() {
            "validate_host_config" => route!(validate_host_config),
            "verify_device_config" => route!(verify_device_config, await),
            "get_config_diff" => route!(get_config_diff),
            "deploy_config" => route!(deploy_config, await),
            "rollback" => route!(rollback),
            "check_compliance" => route!(check_compliance),
            "scan_vulnerabilities" => route!(scan_vulnerabilities),
            "get_deployment" => route!(get_deployment),
            "device_history" => route!(device_history),
            "list_devices" => route!(list_devices),
            "clear_degraded" => route!(clear_degraded),
            "plan_deployment" => route!(plan_deployment),
            other => ToolResponse::failed(format!(
                "unknown tool '{other}' (expected one of: {})",
                TOOLS.join(", ")
            )),
        };
        if response.status == ToolStatus::Failed {
            warn!(%tool, message = %response.message, "tool call failed");
        }
        response
    }

    /// Check a host configuration
    #[must_use]
    pub fn validate_host_config(&self, req: ValidateHostConfigRequest) -> ToolResponse {
        let dialect = match req.dialect.parse::<Dialect>() {
            Ok(d) if d.is_host() => d,
            Ok(d) => {
                return ToolResponse::failed(format!(
                    "{d} is a device dialect; use verify_device_config"
                ))
            }
            Err(e) => return ToolResponse::failed(e.to_string()),
        };
        let report = self.validator.report(&req.content, dialect);
        let errors = report.errors().count();
        let warnings = report.warnings().count();
        if report.valid {
            ToolResponse::with_data(
                ToolStatus::Success,
                format!("{dialect} config is valid ({warnings} warning(s))"),
                &report,
            )
        } else {
            ToolResponse::with_data(
                ToolStatus::BlockedByValidation,
                format!("{dialect} config is invalid: {errors} error(s), {warnings} warning(s)"),
                &report,
            )
        }
    }

    /// Statically analyse a device configuration
    pub async fn verify_device_config(&self, req: VerifyDeviceConfigRequest) -> ToolResponse {
        let platform = match req.platform.parse::<Platform>() {
            Ok(p) => p,
            Err(e) => return ToolResponse::failed(e.to_string()),
        };
        let report = self.analysis.verify(&req.content, &req.hostname, platform).await;
        if let Some(message) = report.error_message() {
            return ToolResponse::with_data(
                ToolStatus::Failed,
                format!("static analysis unavailable: {message}"),
                &report,
            );
        }
        let issues = report.to_validation_issues();
        let errors = issues.iter().filter(|i| i.is_error()).count();
        if errors > 0 {
            ToolResponse::with_data(
                ToolStatus::BlockedByValidation,
                format!(
                    "{} ({platform}): {errors} error(s), {} undefined reference(s)",
                    req.hostname,
                    report.undefined_references.len()
                ),
                &report,
            )
        } else {
            ToolResponse::with_data(
                ToolStatus::Success,
                format!("{} ({platform}) verified, {} warning(s)", req.hostname, issues.len()),
                &report,
            )
        }
    }

    /// Diff a candidate against the device's current configuration
    #[must_use]
    pub fn get_config_diff(&self, req: GetConfigDiffRequest) -> ToolResponse {
        let device = DeviceId::new(req.device);
        let changes = match self.orchestrator.diff_against_current(&device, &req.candidate) {
            Ok(d) => d,
            Err(e) => return ToolResponse::failed(e.to_string()),
        };
        let unified = self.orchestrator.render_diff(&device, &changes);
        let message = if changes.is_empty() {
            format!("no changes for {device}")
        } else {
            format!(
                "{device}: +{} -{} in {} hunk(s)",
                changes.added(),
                changes.removed(),
                changes.hunks().len()
            )
        };
        ToolResponse::with_data(
            ToolStatus::Success,
            message,
            &json!({
                "device": device,
                "added": changes.added(),
                "removed": changes.removed(),
                "unified": unified,
                "diff": changes,
            }),
        )
    }

    /// Run a candidate through the deployment state machine
    pub async fn deploy_config(&self, req: DeployConfigRequest) -> ToolResponse {
        let device = DeviceId::new(req.device);
        let options = DeployOptions {
            dry_run: req.dry_run,
            auto_rollback: req.auto_rollback,
        };
        match self.orchestrator.deploy(&device, &req.candidate, options).await {
            Ok(record) => record_response(&record),
            Err(e) => ToolResponse::failed(e.to_string()),
        }
    }

    /// Restore the backup of a committed deployment
    #[must_use]
    pub fn rollback(&self, req: RollbackRequest) -> ToolResponse {
        let revision = match req.revision.parse::<Revision>() {
            Ok(r) => r,
            Err(e) => return ToolResponse::failed(e.to_string()),
        };
        let device = DeviceId::new(req.device);
        match self.orchestrator.rollback(&device, revision) {
            Ok(record) => record_response(&record),
            Err(e) => ToolResponse::failed(e.to_string()),
        }
    }

    /// Audit a configuration against a ruleset
    #[must_use]
    pub fn check_compliance(&self, req: CheckComplianceRequest) -> ToolResponse {
        match self.auditor.audit(&req.content, &req.ruleset) {
            Ok(report) => {
                let message = if report.is_compliant() {
                    format!("compliant with '{}'", report.ruleset)
                } else {
                    format!(
                        "{} violation(s) of '{}'",
                        report.violations.len(),
                        report.ruleset
                    )
                };
                ToolResponse::with_data(ToolStatus::Success, message, &report)
            }
            Err(e) => ToolResponse::failed(e.to_string()),
        }
    }

    /// Look up advisories for a version tag
    #[must_use]
    pub fn scan_vulnerabilities(&self, req: ScanVulnerabilitiesRequest) -> ToolResponse {
        let findings = self.auditor.scan_vulnerabilities(&req.version);
        let advisories = findings
            .iter()
            .filter(|f| matches!(f, Finding::Advisory { .. }))
            .count();
        let message = match findings.first() {
            Some(unknown @ Finding::UnknownVersion { .. }) => unknown.to_string(),
            _ if advisories == 0 => format!("no known advisories for {}", req.version),
            _ => format!("{advisories} advisory(ies) for {}", req.version),
        };
        ToolResponse::with_data(ToolStatus::Success, message, &findings)
    }

    /// Stored deployment record
    #[must_use]
    pub fn get_deployment(&self, req: GetDeploymentRequest) -> ToolResponse {
        let id = match req.id.trim().parse::<DeploymentId>() {
            Ok(id) => id,
            Err(e) => return ToolResponse::failed(format!("invalid deployment id '{}': {e}", req.id)),
        };
        match self.orchestrator.record(id) {
            Ok(record) => ToolResponse::with_data(
                ToolStatus::Success,
                format!("{} on {}: {}", record.id(), record.device(), record.state()),
                &record,
            ),
            Err(e) => ToolResponse::failed(e.to_string()),
        }
    }

    /// Stored records of a device, oldest first
    #[must_use]
    pub fn device_history(&self, req: DeviceRequest) -> ToolResponse {
        let device = DeviceId::new(req.device);
        match self.orchestrator.history(&device) {
            Ok(records) => ToolResponse::with_data(
                ToolStatus::Success,
                format!("{} record(s) for {device}", records.len()),
                &records,
            ),
            Err(e) => ToolResponse::failed(e.to_string()),
        }
    }

    /// Registered devices
    #[must_use]
    pub fn list_devices(&self, _req: EmptyRequest) -> ToolResponse {
        let devices = self.orchestrator.devices();
        let degraded = devices.iter().filter(|d| d.is_degraded()).count();
        ToolResponse::with_data(
            ToolStatus::Success,
            format!("{} device(s), {degraded} degraded", devices.len()),
            &devices,
        )
    }

    /// Clear a device's degraded marker after manual repair
    #[must_use]
    pub fn clear_degraded(&self, req: DeviceRequest) -> ToolResponse {
        let device = DeviceId::new(req.device);
        match self.orchestrator.clear_degraded(&device) {
            Ok(()) => {
                info!(%device, "cleared through tool call");
                ToolResponse {
                    status: ToolStatus::Success,
                    message: format!("{device} is no longer degraded"),
                    data: None,
                }
            }
            Err(e) => ToolResponse::failed(e.to_string()),
        }
    }

    /// Safe deployment workflow for a device
    #[must_use]
    pub fn plan_deployment(&self, req: DeviceRequest) -> ToolResponse {
        let device = match self.orchestrator.device(&DeviceId::new(req.device)) {
            Ok(d) => d,
            Err(e) => return ToolResponse::failed(e.to_string()),
        };
        let verify = if device.dialect().is_host() {
            format!("validate_host_config with dialect={}", device.dialect())
        } else {
            format!(
                "verify_device_config with hostname={} platform={}",
                device.id(),
                device.dialect()
            )
        };
        let steps = vec![
            format!(
                "Review the current configuration of {} (revision {}).",
                device.id(),
                device.current().hash().short()
            ),
            "Prepare the candidate configuration.".to_string(),
            "Call get_config_diff to review the changes.".to_string(),
            format!("Call {verify}."),
            "Call check_compliance and resolve any violations.".to_string(),
            "Call deploy_config with dry_run=true and read the preview.".to_string(),
            "Call deploy_config with dry_run=false and auto_rollback=true.".to_string(),
        ];
        let mut message = format!("To deploy safely to {}:", device.id());
        for (n, step) in steps.iter().enumerate() {
            let _ = write!(message, "\n{}. {step}", n + 1);
        }
        if device.is_degraded() {
            message.push_str("\nThe device is degraded: repair it and call clear_degraded first.");
        }
        ToolResponse::with_data(ToolStatus::Success, message, &json!({ "steps": steps }))
    }
}

/// Status and message for a finished record
fn record_response(record: &DeploymentRecord) -> ToolResponse {
    let (status, message) = match record.state() {
        DeploymentState::DryRun => (
            ToolStatus::Success,
            record.preview().unwrap_or_default().to_string(),
        ),
        DeploymentState::Committed => (
            ToolStatus::Success,
            format!(
                "deployed to {} ({}), now at {}",
                record.device(),
                record.id(),
                record.candidate().hash().short()
            ),
        ),
        DeploymentState::RolledBack => {
            let reason = record
                .transitions()
                .last()
                .map(|t| t.note.as_str())
                .unwrap_or_default();
            match record.kind() {
                RecordKind::ManualRollback { of } => (
                    ToolStatus::Success,
                    format!("{} restored to its state before {of}", record.device()),
                ),
                RecordKind::Deploy => (
                    ToolStatus::RolledBack,
                    format!("{} rolled back: {reason}", record.device()),
                ),
            }
        }
        DeploymentState::Failed if record.issues().iter().any(|i| i.is_error()) => (
            ToolStatus::BlockedByValidation,
            record.failure().unwrap_or("validation failed").to_string(),
        ),
        state => (
            ToolStatus::Failed,
            record
                .failure()
                .map_or_else(|| format!("deployment stopped in {state}"), str::to_string),
        ),
    };
    ToolResponse::with_data(status, message, record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(ToolStatus::Success.exit_code(), 0);
        assert_eq!(ToolStatus::Failed.exit_code(), 1);
        assert_eq!(ToolStatus::BlockedByValidation.exit_code(), 2);
        assert_eq!(ToolStatus::RolledBack.exit_code(), 3);
    }

    #[test]
    fn status_wire_names() {
        let json = serde_json::to_string(&ToolStatus::BlockedByValidation).unwrap();
        assert_eq!(json, "\"blocked_by_validation\"");
    }

    #[test]
    fn every_tool_has_a_schema() {
        let schemas = schemas();
        for tool in TOOLS {
            assert!(schemas.contains_key(tool), "missing schema for {tool}");
        }
        assert_eq!(schemas.len(), TOOLS.len());
    }

    #[test]
    fn null_arguments_decode_as_empty_object() {
        let req: EmptyRequest = decode("list_devices", Value::Null).unwrap();
        assert_eq!(req, EmptyRequest {});
        let err = decode::<DeviceRequest>("device_history", Value::Null).unwrap_err();
        assert_eq!(err.status, ToolStatus::Failed);
        assert!(err.message.contains("device_history"));
    }
}
