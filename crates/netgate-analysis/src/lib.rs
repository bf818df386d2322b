//! Netgate Analysis - isolated static analysis of device configurations
//!
//! The [`StaticAnalysisEngine`] stages each submitted configuration into its
//! own disposable snapshot on an [`AnalysisBackend`] and reports parse
//! status, initialisation issues and undefined references. The bundled
//! [`LocalBackend`] models IOS, EOS and Junos configurations in process.
//!
//! # Example
//!
//! ```rust,ignore
//! use netgate_analysis::StaticAnalysisEngine;
//! use netgate_model::Platform;
//!
//! let engine = StaticAnalysisEngine::default();
//! let report = engine.verify(config, "core-router", Platform::CiscoIos).await;
//! for issue in report.to_validation_issues() {
//!     println!("{issue}");
//! }
//! ```

#![warn(unreachable_pub)]

pub mod backend;
pub mod engine;
pub mod error;
pub mod local;
pub mod types;

pub use backend::AnalysisBackend;
pub use engine::{StaticAnalysisEngine, DEFAULT_ANALYSIS_TIMEOUT};
pub use error::AnalysisError;
pub use local::{LocalBackend, DEFAULT_MAX_SNAPSHOTS, DEFAULT_SNAPSHOT_TTL};
pub use types::{
    AnalysisReport, AnalysisResult, FileParseStatus, InitIssue, InitIssueKind, ParseStatus,
    Reference, SnapshotFile, SnapshotName, StructureKind,
};
