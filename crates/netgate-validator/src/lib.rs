//! Netgate Validator - pure host configuration checks
//!
//! Checks netplan and Debian interfaces files for structural and semantic
//! problems. Validation performs no I/O and never fails: everything it finds,
//! including unparsable input, comes back as
//! [`ValidationIssue`](netgate_model::ValidationIssue)s.
//!
//! # Example
//!
//! ```rust
//! use netgate_model::Dialect;
//! use netgate_validator::ConfigValidator;
//!
//! let validator = ConfigValidator::default();
//! let report = validator.report("ethernets: {}\n", Dialect::Netplan);
//! assert!(!report.valid);
//! ```

#![warn(unreachable_pub)]

pub mod cidr;
pub mod dialects;
pub mod error;
pub mod validator;

pub use dialects::{default_checkers, CheckerRegistry, DialectChecker, InterfacesChecker, NetplanChecker};
pub use error::CheckError;
pub use validator::{ConfigValidator, ValidationReport};
