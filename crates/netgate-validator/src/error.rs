//! Checker error types
//!
//! Checkers use these internally to short-circuit on structural problems.
//! They never leave the crate as `Err`; [`CheckError::into_issue`] turns each
//! one into a [`ValidationIssue`].

use netgate_model::ValidationIssue;

/// A problem found while checking one document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// Text could not be parsed at all
    #[error("{message}")]
    Parse {
        /// 1-based line, when the parser reports one
        line: Option<usize>,
        /// Parser message
        message: String,
    },

    /// Text parsed but violates the dialect's rules
    #[error("{message}")]
    Semantic {
        /// 1-based line, when known
        line: Option<usize>,
        /// Description
        message: String,
    },
}

impl CheckError {
    /// Create parse error
    pub fn parse(line: Option<usize>, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create semantic violation
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic {
            line: None,
            message: message.into(),
        }
    }

    /// Convert into an error-severity issue attributed to `source`
    #[must_use]
    pub fn into_issue(self, source: &str) -> ValidationIssue {
        let (issue, line) = match self {
            Self::Parse { line, message } => (ValidationIssue::parse_error(source, message), line),
            Self::Semantic { line, message } => (ValidationIssue::error(source, message), line),
        };
        match line {
            Some(line) => issue.at_line(line),
            None => issue,
        }
    }
}

impl From<serde_yaml::Error> for CheckError {
    fn from(err: serde_yaml::Error) -> Self {
        let line = err.location().map(|loc| loc.line());
        Self::parse(line, format!("YAML syntax error: {err}"))
    }
}
