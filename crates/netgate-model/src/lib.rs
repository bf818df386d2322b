//! Netgate Model - shared types for verified configuration deployment
//!
//! - [`ConfigurationSnapshot`]: immutable, content-hashed configuration text
//! - [`Device`]: a managed device and its single current snapshot
//! - [`DeploymentRecord`]: one candidate's trip through the state machine
//! - [`diff`]: line-level diff between two configurations
//!
//! # Example
//!
//! ```rust
//! use netgate_model::{diff, ConfigurationSnapshot, Dialect};
//!
//! let running = ConfigurationSnapshot::live("hostname r1\n!\n", Dialect::CiscoIos);
//! let record = diff(running.content(), "hostname r1\nntp server 10.0.0.1\n!\n");
//! assert_eq!(record.added(), 1);
//! ```

#![warn(unreachable_pub)]

pub mod deployment;
pub mod device;
pub mod dialect;
pub mod diff;
pub mod hash;
pub mod issue;
pub mod snapshot;
pub mod state_machine;

pub use deployment::{
    DeployOptions, DeploymentId, DeploymentRecord, DeploymentState, Outcome, RecordKind,
    Transition,
};
pub use device::{Device, DeviceHealth, DeviceId};
pub use dialect::{Dialect, Platform, UnknownDialect};
pub use diff::{diff, DiffHunk, DiffLine, DiffRecord, LineOp, CONTEXT_LINES};
pub use hash::{ContentHash, HashError};
pub use issue::{has_errors, IssueKind, Severity, ValidationIssue};
pub use snapshot::{ConfigurationSnapshot, SnapshotId, SnapshotOrigin};
pub use state_machine::{allowed_transitions, validate_transition, TransitionError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
