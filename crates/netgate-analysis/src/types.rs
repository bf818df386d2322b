//! Analysis result types

use netgate_model::{Platform, Severity, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue source recorded on converted validation issues
pub const SOURCE: &str = "static_analysis";

/// Name of an isolated analysis snapshot (`snap_<8 hex>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotName(String);

impl SnapshotName {
    /// Fresh random name
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; 4] = rand::random();
        Self(format!("snap_{}", hex::encode(bytes)))
    }

    /// Wrap an existing name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name as text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file staged into a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// File name, e.g. `core-router.cfg`
    pub name: String,
    /// Raw configuration
    pub content: String,
    /// Platform the text is written for
    pub platform: Platform,
}

/// Per-file parse verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseStatus {
    /// Fully understood
    Passed,
    /// Parsed with unrecognised statements
    PartiallyUnrecognized,
    /// Not usable
    Failed,
}

/// Parse status for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileParseStatus {
    /// File name
    pub file_name: String,
    /// Verdict
    pub status: ParseStatus,
}

/// Class of initialisation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitIssueKind {
    /// Malformed statement
    ParseError,
    /// Statement the model does not understand
    UnrecognizedSyntax,
    /// Statement that can never match
    UnreachableStatement,
}

/// Issue raised while building the network model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitIssue {
    /// File name
    pub file_name: String,
    /// 1-based line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Severity
    pub severity: Severity,
    /// Kind
    pub kind: InitIssueKind,
    /// Description
    pub description: String,
}

/// Named structure that can be defined and referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// IP access list
    AccessList,
    /// Route map
    RouteMap,
    /// Prefix list
    PrefixList,
    /// Junos policy statement
    PolicyStatement,
}

impl StructureKind {
    /// Human label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AccessList => "access-list",
            Self::RouteMap => "route-map",
            Self::PrefixList => "prefix-list",
            Self::PolicyStatement => "policy-statement",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Use of a named structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// File name
    pub file_name: String,
    /// Referenced structure kind
    pub kind: StructureKind,
    /// Referenced name
    pub name: String,
    /// Where it is used, e.g. `interface GigabitEthernet0/1 ip access-group`
    pub context: String,
    /// 1-based line
    pub line: usize,
}

/// Result of analysing one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisResult {
    /// Snapshot built; results are complete
    Success {
        /// Parse verdict per file
        parse_status: Vec<FileParseStatus>,
        /// Initialisation issues
        issues: Vec<InitIssue>,
        /// Snapshot name
        snapshot: SnapshotName,
    },
    /// Backend unavailable, initialisation failed or timed out
    Error {
        /// What went wrong
        message: String,
    },
}

impl AnalysisResult {
    /// Error result
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether analysis completed
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Snapshot name on success
    #[must_use]
    pub fn snapshot(&self) -> Option<&SnapshotName> {
        match self {
            Self::Success { snapshot, .. } => Some(snapshot),
            Self::Error { .. } => None,
        }
    }
}

/// Full verification of one configuration: analysis plus reference check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Analysis result
    #[serde(flatten)]
    pub result: AnalysisResult,
    /// References to undefined structures
    #[serde(default)]
    pub undefined_references: Vec<Reference>,
}

impl AnalysisReport {
    /// Error message when analysis did not complete
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.result {
            AnalysisResult::Error { message } => Some(message),
            AnalysisResult::Success { .. } => None,
        }
    }

    /// Map findings onto validation issues
    ///
    /// Failed parses and undefined references are errors; unrecognised
    /// syntax and unreachable statements are warnings.
    #[must_use]
    pub fn to_validation_issues(&self) -> Vec<ValidationIssue> {
        let (parse_status, issues) = match &self.result {
            AnalysisResult::Error { message } => {
                return vec![ValidationIssue::error(
                    SOURCE,
                    format!("static analysis unavailable: {message}"),
                )]
            }
            AnalysisResult::Success {
                parse_status,
                issues,
                ..
            } => (parse_status, issues),
        };

        let mut out = Vec::new();
        for file in parse_status {
            if file.status == ParseStatus::Failed {
                out.push(ValidationIssue::parse_error(
                    SOURCE,
                    format!("{} failed to parse", file.file_name),
                ));
            }
        }
        for issue in issues {
            let converted = match issue.kind {
                InitIssueKind::ParseError => {
                    ValidationIssue::parse_error(SOURCE, issue.description.clone())
                }
                InitIssueKind::UnrecognizedSyntax | InitIssueKind::UnreachableStatement => {
                    ValidationIssue::warning(SOURCE, issue.description.clone())
                }
            };
            out.push(match issue.line {
                Some(line) => converted.at_line(line),
                None => converted,
            });
        }
        for reference in &self.undefined_references {
            out.push(
                ValidationIssue::error(
                    SOURCE,
                    format!(
                        "undefined {} '{}' referenced by {}",
                        reference.kind, reference.name, reference.context
                    ),
                )
                .at_line(reference.line),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgate_model::{has_errors, IssueKind};

    #[test]
    fn snapshot_names_are_random_hex() {
        let a = SnapshotName::generate();
        let b = SnapshotName::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("snap_"));
        assert_eq!(a.as_str().len(), "snap_".len() + 8);
    }

    #[test]
    fn result_is_tagged_by_status() {
        let json = serde_json::to_value(AnalysisResult::error("connection refused")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "connection refused");

        let ok = AnalysisResult::Success {
            parse_status: vec![FileParseStatus {
                file_name: "r1.cfg".into(),
                status: ParseStatus::PartiallyUnrecognized,
            }],
            issues: vec![],
            snapshot: SnapshotName::new("snap_00000000"),
        };
        let json = serde_json::to_value(ok).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["parse_status"][0]["status"], "PARTIALLY_UNRECOGNIZED");
    }

    #[test]
    fn issue_mapping() {
        let report = AnalysisReport {
            result: AnalysisResult::Success {
                parse_status: vec![FileParseStatus {
                    file_name: "r1.cfg".into(),
                    status: ParseStatus::PartiallyUnrecognized,
                }],
                issues: vec![InitIssue {
                    file_name: "r1.cfg".into(),
                    line: Some(7),
                    severity: Severity::Warning,
                    kind: InitIssueKind::UnrecognizedSyntax,
                    description: "unrecognized statement 'frobnicate'".into(),
                }],
                snapshot: SnapshotName::new("snap_00000000"),
            },
            undefined_references: vec![Reference {
                file_name: "r1.cfg".into(),
                kind: StructureKind::AccessList,
                name: "MGMT".into(),
                context: "line vty 0 4 access-class".into(),
                line: 12,
            }],
        };

        let issues = report.to_validation_issues();
        assert_eq!(issues.len(), 2);
        assert!(!issues[0].is_error());
        assert_eq!(issues[1].kind, IssueKind::Semantic);
        assert_eq!(
            issues[1].message,
            "undefined access-list 'MGMT' referenced by line vty 0 4 access-class"
        );
        assert!(has_errors(&issues));
    }
}
