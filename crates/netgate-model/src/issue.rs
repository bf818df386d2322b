//! Validation issues
//!
//! Checkers never fail with an error value; everything they find, including
//! unparsable input, is reported as a [`ValidationIssue`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks progression to dry-run
    Error,
    /// Reported only
    Warning,
}

/// What class of problem an issue describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Malformed text
    Parse,
    /// Valid syntax, invalid meaning
    Semantic,
}

/// A single finding from a checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Severity
    pub severity: Severity,
    /// Parse or semantic
    pub kind: IssueKind,
    /// Checker that produced the issue
    pub source: String,
    /// 1-based line, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Human-readable description
    pub message: String,
}

impl ValidationIssue {
    /// Parse error
    #[must_use]
    pub fn parse_error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind: IssueKind::Parse,
            source: source.into(),
            line: None,
            message: message.into(),
        }
    }

    /// Semantic error
    #[must_use]
    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind: IssueKind::Semantic,
            source: source.into(),
            line: None,
            message: message.into(),
        }
    }

    /// Semantic warning
    #[must_use]
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind: IssueKind::Semantic,
            source: source.into(),
            line: None,
            message: message.into(),
        }
    }

    /// Attach a line number
    #[inline]
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Whether this issue blocks deployment
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match self.line {
            Some(line) => write!(f, "{level}[{}] line {line}: {}", self.source, self.message),
            None => write!(f, "{level}[{}]: {}", self.source, self.message),
        }
    }
}

/// True if any issue is error-severity
#[must_use]
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}
