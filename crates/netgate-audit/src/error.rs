//! Audit error types

use std::path::PathBuf;

/// Errors loading or selecting rulesets and vulnerability data
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// No ruleset of that name
    #[error("unknown ruleset: '{0}'")]
    UnknownRuleset(String),

    /// A regex rule does not compile
    #[error("rule '{rule}' has an invalid pattern: {source}")]
    InvalidPattern {
        /// Rule id
        rule: String,
        /// Compiler error
        #[source]
        source: regex::Error,
    },

    /// Two rules in one ruleset share an id
    #[error("duplicate rule id '{0}'")]
    DuplicateRule(String),

    /// Malformed YAML
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error reading a file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },
}

impl AuditError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
