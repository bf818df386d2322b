//! Netgate Audit - golden-rule compliance and vulnerability lookups
//!
//! A [`ComplianceAuditor`] evaluates a named [`Ruleset`] against configuration
//! text and returns a [`ComplianceReport`]. Findings are reported, never
//! enforced.
//!
//! # Example
//!
//! ```rust
//! use netgate_audit::ComplianceAuditor;
//!
//! let auditor = ComplianceAuditor::with_builtin();
//! let report = auditor
//!     .audit("ntp server 10.0.0.1\nno ip http server\n", "golden")
//!     .unwrap();
//! assert_eq!(report.violations.len(), 1);
//! ```

#![warn(unreachable_pub)]

pub mod auditor;
pub mod error;
pub mod rules;
pub mod ruleset;
pub mod vulnerability;

pub use auditor::{ComplianceAuditor, ComplianceReport};
pub use error::AuditError;
pub use rules::{
    extract_version, AbsenceRule, AuditContext, ComplianceRule, PresenceRule, RegexRule,
    RuleDefinition, RuleSpec, VersionLookupRule, Violation,
};
pub use ruleset::{Ruleset, RulesetCatalog, RulesetSpec, GOLDEN};
pub use vulnerability::{Advisory, Finding, VulnerabilityDatabase};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
