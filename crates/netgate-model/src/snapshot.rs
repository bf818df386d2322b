//! Immutable configuration snapshots
//!
//! A [`ConfigurationSnapshot`] is captured once and never mutated. Superseded
//! snapshots stay reachable through deployment records for audit.

use crate::dialect::Dialect;
use crate::hash::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique snapshot identifier (ULID, sortable by capture time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub Ulid);

impl SnapshotId {
    /// Generate new snapshot ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a snapshot's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    /// Captured from the running device
    Live,
    /// Submitted for deployment
    Candidate,
    /// Copy of a device's current config taken before a push
    Backup,
}

/// Captured configuration text plus metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    id: SnapshotId,
    content: String,
    dialect: Dialect,
    captured_at: DateTime<Utc>,
    origin: SnapshotOrigin,
    hash: ContentHash,
}

impl ConfigurationSnapshot {
    /// Capture text now
    #[must_use]
    pub fn capture(content: impl Into<String>, dialect: Dialect, origin: SnapshotOrigin) -> Self {
        let content = content.into();
        let hash = ContentHash::of_text(&content);
        Self {
            id: SnapshotId::new(),
            content,
            dialect,
            captured_at: Utc::now(),
            origin,
            hash,
        }
    }

    /// Snapshot of a running config
    #[inline]
    #[must_use]
    pub fn live(content: impl Into<String>, dialect: Dialect) -> Self {
        Self::capture(content, dialect, SnapshotOrigin::Live)
    }

    /// Snapshot of a submitted candidate
    #[inline]
    #[must_use]
    pub fn candidate(content: impl Into<String>, dialect: Dialect) -> Self {
        Self::capture(content, dialect, SnapshotOrigin::Candidate)
    }

    /// Backup copy: same bytes and hash, new identity, origin `backup`
    #[must_use]
    pub fn as_backup(&self) -> Self {
        Self {
            id: SnapshotId::new(),
            content: self.content.clone(),
            dialect: self.dialect,
            captured_at: Utc::now(),
            origin: SnapshotOrigin::Backup,
            hash: self.hash,
        }
    }

    /// Snapshot identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    /// Raw configuration text
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Dialect tag
    #[inline]
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Capture time (UTC)
    #[inline]
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Origin
    #[inline]
    #[must_use]
    pub fn origin(&self) -> SnapshotOrigin {
        self.origin
    }

    /// Content hash
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Byte-for-byte equality of content, ignoring identity and metadata
    #[inline]
    #[must_use]
    pub fn same_content(&self, other: &ConfigurationSnapshot) -> bool {
        self.hash == other.hash && self.content == other.content
    }

    /// Recompute the hash and compare against the stored one
    #[must_use]
    pub fn verify(&self) -> bool {
        ContentHash::of_text(&self.content) == self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_keeps_bytes_and_hash() {
        let live = ConfigurationSnapshot::live("hostname edge-01\n!", Dialect::CiscoIos);
        let backup = live.as_backup();

        assert_ne!(live.id(), backup.id());
        assert_eq!(backup.origin(), SnapshotOrigin::Backup);
        assert!(live.same_content(&backup));
        assert!(backup.verify());
    }

    #[test]
    fn deserialized_snapshot_verifies() {
        let snap = ConfigurationSnapshot::candidate("auto eth0\n", Dialect::Interfaces);
        let json = serde_json::to_string(&snap).unwrap();
        let back: ConfigurationSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
        assert!(back.verify());
    }
}
