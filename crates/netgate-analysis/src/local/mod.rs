//! In-process analysis backend
//!
//! Builds a small network model per snapshot: parse verdicts, unrecognised
//! and unreachable statements, named-structure definitions and references.
//! Snapshots live in a moka cache and expire after a TTL if never disposed.

use crate::backend::AnalysisBackend;
use crate::error::AnalysisError;
use crate::types::{FileParseStatus, InitIssue, Reference, SnapshotFile, SnapshotName};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

mod ios;
mod junos;
mod model;

use model::NetworkModel;

/// Default snapshot lifetime
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(600);

/// Default number of live snapshots
pub const DEFAULT_MAX_SNAPSHOTS: u64 = 256;

/// Backend that analyses configurations in process
#[derive(Debug, Clone)]
pub struct LocalBackend {
    snapshots: Cache<SnapshotName, Arc<NetworkModel>>,
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SNAPSHOTS, DEFAULT_SNAPSHOT_TTL)
    }
}

impl LocalBackend {
    /// Create with capacity and snapshot TTL
    #[must_use]
    pub fn new(max_snapshots: u64, ttl: Duration) -> Self {
        Self {
            snapshots: Cache::builder()
                .max_capacity(max_snapshots)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Number of live snapshots
    pub async fn snapshot_count(&self) -> u64 {
        self.snapshots.run_pending_tasks().await;
        self.snapshots.entry_count()
    }

    async fn model(&self, name: &SnapshotName) -> Result<Arc<NetworkModel>, AnalysisError> {
        self.snapshots
            .get(name)
            .await
            .ok_or_else(|| AnalysisError::SnapshotNotFound(name.to_string()))
    }
}

#[async_trait]
impl AnalysisBackend for LocalBackend {
    async fn init_snapshot(
        &self,
        name: &SnapshotName,
        files: Vec<SnapshotFile>,
    ) -> Result<(), AnalysisError> {
        if files.is_empty() {
            return Err(AnalysisError::init_failed(name.as_str(), "snapshot has no files"));
        }
        let model = NetworkModel::build(&files);
        debug!(snapshot = %name, files = files.len(), "snapshot initialised");
        self.snapshots.insert(name.clone(), Arc::new(model)).await;
        Ok(())
    }

    async fn file_parse_status(
        &self,
        name: &SnapshotName,
    ) -> Result<Vec<FileParseStatus>, AnalysisError> {
        Ok(self.model(name).await?.parse_status())
    }

    async fn init_issues(&self, name: &SnapshotName) -> Result<Vec<InitIssue>, AnalysisError> {
        Ok(self.model(name).await?.init_issues())
    }

    async fn undefined_references(
        &self,
        name: &SnapshotName,
    ) -> Result<Vec<Reference>, AnalysisError> {
        Ok(self.model(name).await?.undefined_references())
    }

    async fn delete_snapshot(&self, name: &SnapshotName) -> Result<(), AnalysisError> {
        self.snapshots.invalidate(name).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgate_model::Platform;

    fn file(content: &str) -> SnapshotFile {
        SnapshotFile {
            name: "r1.cfg".into(),
            content: content.into(),
            platform: Platform::CiscoIos,
        }
    }

    #[tokio::test]
    async fn snapshots_are_isolated() {
        let backend = LocalBackend::default();
        let a = SnapshotName::new("snap_aaaaaaaa");
        let b = SnapshotName::new("snap_bbbbbbbb");

        backend
            .init_snapshot(&a, vec![file("ip access-list standard MGMT\n permit any\n")])
            .await
            .unwrap();
        backend
            .init_snapshot(&b, vec![file("line vty 0 4\n access-class MGMT in\n")])
            .await
            .unwrap();

        // MGMT is defined only in snapshot a
        assert!(backend.undefined_references(&a).await.unwrap().is_empty());
        assert_eq!(backend.undefined_references(&b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleted_snapshot_is_gone() {
        let backend = LocalBackend::default();
        let name = SnapshotName::generate();
        backend.init_snapshot(&name, vec![file("hostname r1\n")]).await.unwrap();
        assert_eq!(backend.snapshot_count().await, 1);

        backend.delete_snapshot(&name).await.unwrap();
        assert_eq!(backend.snapshot_count().await, 0);
        assert!(matches!(
            backend.file_parse_status(&name).await,
            Err(AnalysisError::SnapshotNotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_snapshot_is_rejected() {
        let backend = LocalBackend::default();
        let err = backend
            .init_snapshot(&SnapshotName::generate(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InitFailed { .. }));
    }
}
