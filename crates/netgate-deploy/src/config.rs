//! Orchestrator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Budget for the post-push health probe, in milliseconds
    pub health_timeout_ms: u64,
    /// Labels used when rendering diffs: `running-config@<device>`
    pub running_label_prefix: String,
    /// Label of the candidate side of a diff
    pub candidate_label: String,
}

impl DeployConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With health timeout
    #[inline]
    #[must_use]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Health timeout
    #[inline]
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// Label of the running side of a diff for `device`
    #[must_use]
    pub fn running_label(&self, device: &str) -> String {
        format!("{}@{device}", self.running_label_prefix)
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            health_timeout_ms: 30_000,
            running_label_prefix: "running-config".to_string(),
            candidate_label: "candidate-config".to_string(),
        }
    }
}
