//! Static analysis engine
//!
//! Every call stages the submitted file into a fresh, uniquely named snapshot
//! so no two calls ever see each other's configuration. All backend calls are
//! bounded by a timeout; a backend that is unavailable, rejects the snapshot
//! or runs out of time produces an error result, never a partial one.

use crate::backend::AnalysisBackend;
use crate::error::AnalysisError;
use crate::local::LocalBackend;
use crate::types::{AnalysisReport, AnalysisResult, Reference, SnapshotFile, SnapshotName};
use netgate_model::Platform;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default budget for a single backend call
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Front end over an [`AnalysisBackend`]
#[derive(Clone)]
pub struct StaticAnalysisEngine {
    backend: Arc<dyn AnalysisBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for StaticAnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAnalysisEngine")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for StaticAnalysisEngine {
    fn default() -> Self {
        Self::new(Arc::new(LocalBackend::default()))
    }
}

impl StaticAnalysisEngine {
    /// Create over a backend with the default timeout
    #[must_use]
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_ANALYSIS_TIMEOUT,
        }
    }

    /// Set the per-call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-call timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, AnalysisError>
    where
        F: Future<Output = Result<T, AnalysisError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout {
                operation,
                after: self.timeout,
            }),
        }
    }

    /// Analyse one configuration in an isolated snapshot.
    ///
    /// On success the snapshot is kept so [`undefined_references`](Self::undefined_references)
    /// can query it; callers release it with [`dispose`](Self::dispose).
    pub async fn analyze(&self, content: &str, filename_hint: &str, platform: Platform) -> AnalysisResult {
        let snapshot = SnapshotName::generate();
        let file = SnapshotFile {
            name: staged_file_name(filename_hint, platform),
            content: content.to_string(),
            platform,
        };

        match self.build(&snapshot, file).await {
            Ok(result) => result,
            Err(err) => {
                error!(snapshot = %snapshot, error = %err, "static analysis failed");
                self.dispose(&snapshot).await;
                AnalysisResult::error(err.to_string())
            }
        }
    }

    async fn build(&self, snapshot: &SnapshotName, file: SnapshotFile) -> Result<AnalysisResult, AnalysisError> {
        let file_name = file.name.clone();
        self.bounded("init_snapshot", self.backend.init_snapshot(snapshot, vec![file]))
            .await?;
        let parse_status = self
            .bounded("file_parse_status", self.backend.file_parse_status(snapshot))
            .await?;
        let issues = self
            .bounded("init_issues", self.backend.init_issues(snapshot))
            .await?;
        debug!(
            snapshot = %snapshot,
            file = %file_name,
            issues = issues.len(),
            "snapshot analysed"
        );
        Ok(AnalysisResult::Success {
            parse_status,
            issues,
            snapshot: snapshot.clone(),
        })
    }

    /// References to undefined structures in a snapshot
    pub async fn undefined_references(&self, snapshot: &SnapshotName) -> Result<Vec<Reference>, AnalysisError> {
        self.bounded(
            "undefined_references",
            self.backend.undefined_references(snapshot),
        )
        .await
    }

    /// Release a snapshot; failures are logged, not returned
    pub async fn dispose(&self, snapshot: &SnapshotName) {
        if let Err(err) = self
            .bounded("delete_snapshot", self.backend.delete_snapshot(snapshot))
            .await
        {
            warn!(snapshot = %snapshot, error = %err, "failed to dispose snapshot");
        }
    }

    /// Analyse, check references and dispose the snapshot
    pub async fn verify(&self, content: &str, hostname: &str, platform: Platform) -> AnalysisReport {
        let result = self.analyze(content, hostname, platform).await;
        let Some(snapshot) = result.snapshot().cloned() else {
            return AnalysisReport {
                result,
                undefined_references: Vec::new(),
            };
        };

        let report = match self.undefined_references(&snapshot).await {
            Ok(undefined_references) => AnalysisReport {
                result,
                undefined_references,
            },
            Err(err) => {
                error!(snapshot = %snapshot, error = %err, "reference check failed");
                AnalysisReport {
                    result: AnalysisResult::error(err.to_string()),
                    undefined_references: Vec::new(),
                }
            }
        };
        self.dispose(&snapshot).await;
        report
    }
}

/// `<hint>.<ext>` for the platform; hints that already carry the extension are kept
fn staged_file_name(hint: &str, platform: Platform) -> String {
    let hint = hint.trim();
    let hint = if hint.is_empty() { "device" } else { hint };
    let ext = platform.file_extension();
    if hint
        .rsplit_once('.')
        .is_some_and(|(_, existing)| existing == ext)
    {
        hint.to_string()
    } else {
        format!("{hint}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockAnalysisBackend;
    use crate::types::{FileParseStatus, ParseStatus};
    use std::sync::Mutex;

    #[test]
    fn staged_names_follow_platform() {
        assert_eq!(staged_file_name("core-router", Platform::CiscoIos), "core-router.cfg");
        assert_eq!(staged_file_name("mx1", Platform::Junos), "mx1.conf");
        assert_eq!(staged_file_name("mx1.conf", Platform::Junos), "mx1.conf");
        assert_eq!(staged_file_name("", Platform::AristaEos), "device.cfg");
    }

    #[tokio::test]
    async fn unavailable_backend_yields_error_result() {
        let mut backend = MockAnalysisBackend::new();
        backend
            .expect_init_snapshot()
            .returning(|_, _| Err(AnalysisError::Unavailable("connection refused".into())));
        backend.expect_delete_snapshot().returning(|_| Ok(()));

        let engine = StaticAnalysisEngine::new(Arc::new(backend));
        let result = engine.analyze("hostname r1\n", "r1", Platform::CiscoIos).await;
        match result {
            AnalysisResult::Error { message } => assert!(message.contains("connection refused")),
            AnalysisResult::Success { .. } => panic!("expected error result"),
        }
    }

    #[tokio::test]
    async fn each_call_uses_a_fresh_snapshot() {
        let mut backend = MockAnalysisBackend::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let record = Arc::clone(&seen);
        backend.expect_init_snapshot().returning(move |name, files| {
            assert_eq!(files.len(), 1);
            record.lock().unwrap().push(name.as_str().to_string());
            Ok(())
        });
        backend.expect_file_parse_status().returning(|_| {
            Ok(vec![FileParseStatus {
                file_name: "r1.cfg".into(),
                status: ParseStatus::Passed,
            }])
        });
        backend.expect_init_issues().returning(|_| Ok(Vec::new()));

        let engine = StaticAnalysisEngine::new(Arc::new(backend));
        let a = engine.analyze("hostname r1\n", "r1", Platform::CiscoIos).await;
        let b = engine.analyze("hostname r1\n", "r1", Platform::CiscoIos).await;

        assert!(a.is_success() && b.is_success());
        assert_ne!(a.snapshot(), b.snapshot());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        struct Hanging;

        #[async_trait::async_trait]
        impl AnalysisBackend for Hanging {
            async fn init_snapshot(&self, _: &SnapshotName, _: Vec<SnapshotFile>) -> Result<(), AnalysisError> {
                std::future::pending().await
            }
            async fn file_parse_status(&self, _: &SnapshotName) -> Result<Vec<FileParseStatus>, AnalysisError> {
                Ok(Vec::new())
            }
            async fn init_issues(&self, _: &SnapshotName) -> Result<Vec<crate::types::InitIssue>, AnalysisError> {
                Ok(Vec::new())
            }
            async fn undefined_references(&self, _: &SnapshotName) -> Result<Vec<Reference>, AnalysisError> {
                Ok(Vec::new())
            }
            async fn delete_snapshot(&self, _: &SnapshotName) -> Result<(), AnalysisError> {
                Ok(())
            }
        }

        let engine = StaticAnalysisEngine::new(Arc::new(Hanging)).with_timeout(Duration::from_secs(2));
        let result = engine.analyze("hostname r1\n", "r1", Platform::CiscoIos).await;
        let AnalysisResult::Error { message } = result else {
            panic!("expected timeout");
        };
        assert!(message.contains("timed out"));
    }
}
