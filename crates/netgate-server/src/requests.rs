//! Tool request types
//!
//! One struct per tool. Dialect, platform and revision names stay strings on
//! the wire and are parsed by the tool, so a bad value becomes a `failed`
//! response instead of a decode error.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_revision() -> String {
    "last".to_string()
}

fn default_ruleset() -> String {
    netgate_audit::GOLDEN.to_string()
}

/// Check a host configuration (netplan or Debian interfaces)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidateHostConfigRequest {
    /// Configuration text
    pub content: String,
    /// `netplan` or `interfaces`
    pub dialect: String,
}

/// Statically analyse a device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VerifyDeviceConfigRequest {
    /// Configuration text
    pub content: String,
    /// Hostname, used to name the staged file
    pub hostname: String,
    /// `cisco_ios`, `junos` or `arista_eos`
    pub platform: String,
}

/// Diff a candidate against a device's current configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GetConfigDiffRequest {
    /// Registered device
    pub device: String,
    /// Candidate configuration text
    pub candidate: String,
}

/// Run a candidate through the deployment state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeployConfigRequest {
    /// Registered device
    pub device: String,
    /// Candidate configuration text
    pub candidate: String,
    /// Stop after the preview
    #[serde(default = "default_true")]
    pub dry_run: bool,
    /// Probe health after the push and restore the backup on failure
    #[serde(default = "default_true")]
    pub auto_rollback: bool,
}

/// Restore the backup of a committed deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RollbackRequest {
    /// Registered device
    pub device: String,
    /// `last` or a deployment id
    #[serde(default = "default_revision")]
    pub revision: String,
}

/// Audit a configuration against a named ruleset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CheckComplianceRequest {
    /// Configuration text
    pub content: String,
    /// Ruleset name
    #[serde(default = "default_ruleset")]
    pub ruleset: String,
}

/// Look up advisories for an OS version tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScanVulnerabilitiesRequest {
    /// Exact version tag
    pub version: String,
}

/// Fetch a stored deployment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GetDeploymentRequest {
    /// Deployment id
    pub id: String,
}

/// Request naming one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceRequest {
    /// Registered device
    pub device: String,
}

/// Request without arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EmptyRequest {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_defaults_are_safe() {
        let req: DeployConfigRequest =
            serde_json::from_str(r#"{"device": "edge-01", "candidate": "x"}"#).unwrap();
        assert!(req.dry_run);
        assert!(req.auto_rollback);
    }

    #[test]
    fn rollback_and_compliance_defaults() {
        let req: RollbackRequest = serde_json::from_str(r#"{"device": "edge-01"}"#).unwrap();
        assert_eq!(req.revision, "last");
        let req: CheckComplianceRequest = serde_json::from_str(r#"{"content": ""}"#).unwrap();
        assert_eq!(req.ruleset, "golden");
    }
}
