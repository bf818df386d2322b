//! Vulnerability database
//!
//! Exact version-tag lookup. A tag mapped to an empty list is known clean; a
//! tag that is absent is unknown, which is reported as its own finding rather
//! than as clean.

use crate::error::AuditError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Published advisory affecting a version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    /// Advisory id, e.g. `CVE-2023-1234`
    pub id: String,
    /// Short description
    pub summary: String,
}

impl Advisory {
    /// Parse `"<id>: <summary>"`; text without a colon is all id
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((id, summary)) => Self {
                id: id.trim().to_string(),
                summary: summary.trim().to_string(),
            },
            None => Self {
                id: text.trim().to_string(),
                summary: String::new(),
            },
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.summary.is_empty() {
            f.write_str(&self.id)
        } else {
            write!(f, "{}: {}", self.id, self.summary)
        }
    }
}

/// Result of a vulnerability scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// The version is affected by an advisory
    Advisory {
        /// Scanned version tag
        version: String,
        /// Advisory
        advisory: Advisory,
    },
    /// The version is not in the database
    UnknownVersion {
        /// Scanned version tag
        version: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advisory { advisory, .. } => fmt::Display::fmt(advisory, f),
            Self::UnknownVersion { version } => {
                write!(f, "unknown version '{version}': no vulnerability data")
            }
        }
    }
}

/// Version tag to advisories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VulnerabilityDatabase {
    entries: BTreeMap<String, Vec<Advisory>>,
}

impl VulnerabilityDatabase {
    /// Empty database
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in data set
    #[must_use]
    pub fn builtin() -> Self {
        let mut db = Self::new();
        db.insert("16.03.01", vec![Advisory::parse("CVE-2023-1234: SSH Exploit")]);
        db.insert("4.21.0F", Vec::new());
        db
    }

    /// Parse YAML: a mapping from version tag to a list of `"<id>: <summary>"`
    pub fn from_yaml(text: &str) -> Result<Self, AuditError> {
        let raw: BTreeMap<String, Vec<String>> = serde_yaml::from_str(text)?;
        let entries = raw
            .into_iter()
            .map(|(version, advisories)| {
                let advisories = advisories.iter().map(|a| Advisory::parse(a)).collect();
                (version, advisories)
            })
            .collect();
        Ok(Self { entries })
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io_error(path, e))?;
        Self::from_yaml(&text)
    }

    /// Add or replace a version
    pub fn insert(&mut self, version: impl Into<String>, advisories: Vec<Advisory>) {
        self.entries.insert(version.into(), advisories);
    }

    /// Advisories for a version; `None` if the version is unknown
    #[must_use]
    pub fn lookup(&self, version: &str) -> Option<&[Advisory]> {
        self.entries.get(version.trim()).map(Vec::as_slice)
    }

    /// Scan a version tag
    #[must_use]
    pub fn scan(&self, version: &str) -> Vec<Finding> {
        let version = version.trim();
        match self.lookup(version) {
            Some(advisories) => advisories
                .iter()
                .map(|advisory| Finding::Advisory {
                    version: version.to_string(),
                    advisory: advisory.clone(),
                })
                .collect(),
            None => vec![Finding::UnknownVersion {
                version: version.to_string(),
            }],
        }
    }

    /// Number of versions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No versions at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
