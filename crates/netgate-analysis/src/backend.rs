//! Analysis backend trait
//!
//! A backend owns named snapshots. Each snapshot is built from its own files
//! and answers questions only about those files.

use crate::error::AnalysisError;
use crate::types::{FileParseStatus, InitIssue, Reference, SnapshotFile, SnapshotName};
use async_trait::async_trait;

/// Snapshot-based static analysis service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Build a snapshot from `files`, replacing any snapshot of the same name
    async fn init_snapshot(
        &self,
        name: &SnapshotName,
        files: Vec<SnapshotFile>,
    ) -> Result<(), AnalysisError>;

    /// Parse verdict for each file
    async fn file_parse_status(
        &self,
        name: &SnapshotName,
    ) -> Result<Vec<FileParseStatus>, AnalysisError>;

    /// Issues raised while building the model
    async fn init_issues(&self, name: &SnapshotName) -> Result<Vec<InitIssue>, AnalysisError>;

    /// References to structures that are never defined
    async fn undefined_references(
        &self,
        name: &SnapshotName,
    ) -> Result<Vec<Reference>, AnalysisError>;

    /// Drop a snapshot
    async fn delete_snapshot(&self, name: &SnapshotName) -> Result<(), AnalysisError>;
}
