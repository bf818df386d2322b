//! Host configuration validator

use crate::dialects::{default_checkers, CheckerRegistry};
use netgate_model::{has_errors, Dialect, Severity, ValidationIssue};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// No error-severity issues
    pub valid: bool,
    /// Everything found, in checker order
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Build from issues
    #[must_use]
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            valid: !has_errors(&issues),
            issues,
        }
    }

    /// Error-severity issues
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    /// Warning-severity issues
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

/// Pure checker front end: dispatches by dialect, never fails
#[derive(Debug)]
pub struct ConfigValidator {
    registry: CheckerRegistry,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new(default_checkers())
    }
}

impl ConfigValidator {
    /// Create with a checker registry
    #[inline]
    #[must_use]
    pub fn new(registry: CheckerRegistry) -> Self {
        Self { registry }
    }

    /// Registry in use
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &CheckerRegistry {
        &self.registry
    }

    /// Whether a checker exists for `dialect`
    #[inline]
    #[must_use]
    pub fn supports(&self, dialect: Dialect) -> bool {
        self.registry.get(dialect).is_some()
    }

    /// Check one document
    #[must_use]
    pub fn validate(&self, content: &str, dialect: Dialect) -> Vec<ValidationIssue> {
        let Some(checker) = self.registry.get(dialect) else {
            return vec![ValidationIssue::error(
                "validator",
                format!("no host checker for dialect {dialect}"),
            )];
        };
        let issues = checker.check(content);
        debug!(
            dialect = %dialect,
            issues = issues.len(),
            errors = issues.iter().filter(|i| i.is_error()).count(),
            "host config checked"
        );
        issues
    }

    /// Check one document and summarise
    #[must_use]
    pub fn report(&self, content: &str, dialect: Dialect) -> ValidationReport {
        ValidationReport::from_issues(self.validate(content, dialect))
    }

    /// Check many documents in parallel; output order matches input order
    #[must_use]
    pub fn validate_batch<S>(&self, items: &[(S, Dialect)]) -> Vec<ValidationReport>
    where
        S: AsRef<str> + Sync,
    {
        items
            .par_iter()
            .map(|(content, dialect)| self.report(content.as_ref(), *dialect))
            .collect()
    }
}
