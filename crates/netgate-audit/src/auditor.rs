//! Compliance auditor

use crate::error::AuditError;
use crate::rules::{AuditContext, Violation};
use crate::ruleset::{Ruleset, RulesetCatalog};
use crate::vulnerability::{Finding, VulnerabilityDatabase};
use netgate_model::ContentHash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of one audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Ruleset evaluated
    pub ruleset: String,
    /// Hash of the audited text
    pub snapshot_hash: ContentHash,
    /// Violations in rule order
    pub violations: Vec<Violation>,
}

impl ComplianceReport {
    /// True when every rule passed
    #[inline]
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Evaluates rulesets and vulnerability data against configuration text
///
/// Audits are read-only: they never touch a device or block a deployment.
#[derive(Debug, Clone, Default)]
pub struct ComplianceAuditor {
    catalog: RulesetCatalog,
    vulnerabilities: Arc<VulnerabilityDatabase>,
}

impl ComplianceAuditor {
    /// Auditor over a catalog and database
    #[must_use]
    pub fn new(catalog: RulesetCatalog, vulnerabilities: VulnerabilityDatabase) -> Self {
        Self {
            catalog,
            vulnerabilities: Arc::new(vulnerabilities),
        }
    }

    /// Golden ruleset and the built-in vulnerability data
    #[must_use]
    pub fn with_builtin() -> Self {
        Self::new(RulesetCatalog::default(), VulnerabilityDatabase::builtin())
    }

    /// Rulesets available by name
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &RulesetCatalog {
        &self.catalog
    }

    /// Mutable catalog, for loading extra rulesets
    #[inline]
    pub fn catalog_mut(&mut self) -> &mut RulesetCatalog {
        &mut self.catalog
    }

    /// Vulnerability data in use
    #[inline]
    #[must_use]
    pub fn vulnerabilities(&self) -> &VulnerabilityDatabase {
        &self.vulnerabilities
    }

    /// Audit `config` against a named ruleset
    pub fn audit(&self, config: &str, ruleset: &str) -> Result<ComplianceReport, AuditError> {
        let ruleset = self.catalog.get(ruleset)?;
        Ok(self.audit_with(&ruleset, config))
    }

    /// Audit `config` against an explicit ruleset
    #[must_use]
    pub fn audit_with(&self, ruleset: &Ruleset, config: &str) -> ComplianceReport {
        let ctx = AuditContext {
            vulnerabilities: &self.vulnerabilities,
        };
        let violations: Vec<Violation> = ruleset
            .rules()
            .iter()
            .flat_map(|rule| {
                let found = rule.evaluate(config, &ctx);
                debug!(rule = rule.id(), violations = found.len(), "rule evaluated");
                found
            })
            .collect();

        let report = ComplianceReport {
            ruleset: ruleset.name().to_string(),
            snapshot_hash: ContentHash::of_text(config),
            violations,
        };
        info!(
            ruleset = %report.ruleset,
            hash = %report.snapshot_hash.short(),
            violations = report.violations.len(),
            "compliance audit finished"
        );
        report
    }

    /// Vulnerability findings for a version tag
    #[must_use]
    pub fn scan_vulnerabilities(&self, version: &str) -> Vec<Finding> {
        let findings = self.vulnerabilities.scan(version);
        info!(version, findings = findings.len(), "vulnerability scan finished");
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliant_config_has_no_violations() {
        let auditor = ComplianceAuditor::with_builtin();
        let config = "service password-encryption\nntp server 10.0.0.1\nno ip http server\n";
        let report = auditor.audit(config, "golden").unwrap();
        assert!(report.is_compliant());
        assert_eq!(report.snapshot_hash, ContentHash::of_text(config));
    }

    #[test]
    fn unknown_ruleset() {
        let auditor = ComplianceAuditor::with_builtin();
        assert!(matches!(
            auditor.audit("", "nope"),
            Err(AuditError::UnknownRuleset(name)) if name == "nope"
        ));
    }

    #[test]
    fn empty_config_fails_every_golden_rule() {
        let auditor = ComplianceAuditor::with_builtin();
        let report = auditor.audit("", "golden").unwrap();
        let rules: Vec<_> = report.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["password-encryption", "ntp", "no-http-server"]);
    }
}
