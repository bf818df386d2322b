//! Hash-chained transition journal
//!
//! Every persisted state change is appended with the SHA-256 of its fields and
//! of the previous entry. [`TransitionJournal::verify_integrity`] walks the
//! chain and reports the first entry that does not match.

use chrono::{DateTime, Utc};
use netgate_model::{DeploymentId, DeploymentState, DeviceId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const GENESIS: [u8; 32] = [0u8; 32];

/// One journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the chain, from 0
    pub seq: u64,
    /// When it was appended
    pub at: DateTime<Utc>,
    /// Record that changed
    pub deployment: DeploymentId,
    /// Device of the record
    pub device: DeviceId,
    /// Previous state; `None` for record creation
    pub from: Option<DeploymentState>,
    /// New state
    pub to: DeploymentState,
    /// Note carried by the transition
    pub note: String,
    /// Hex hash of the previous entry
    pub prev_hash: String,
    /// Hex hash of this entry
    pub hash: String,
}

/// Chain verification failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    /// Entry's `prev_hash` does not point at its predecessor
    #[error("journal entry {seq} is not linked to its predecessor")]
    BrokenLink {
        /// Offending entry
        seq: u64,
    },
    /// Entry's hash does not match its contents
    #[error("journal entry {seq} was modified")]
    Tampered {
        /// Offending entry
        seq: u64,
    },
}

/// Append-only journal
#[derive(Debug, Default)]
pub struct TransitionJournal {
    inner: Mutex<Vec<JournalEntry>>,
}

impl TransitionJournal {
    /// Empty journal
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a state change, returning its sequence number
    pub fn append(
        &self,
        deployment: DeploymentId,
        device: &DeviceId,
        from: Option<DeploymentState>,
        to: DeploymentState,
        note: &str,
    ) -> u64 {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or_else(|| hex::encode(GENESIS), |e| e.hash.clone());
        let mut entry = JournalEntry {
            seq: guard.len() as u64,
            at: Utc::now(),
            deployment,
            device: device.clone(),
            from,
            to,
            note: note.to_string(),
            prev_hash,
            hash: String::new(),
        };
        entry.hash = hex::encode(compute_hash(&entry));
        let seq = entry.seq;
        guard.push(entry);
        seq
    }

    /// Copy of every entry
    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner.lock().clone()
    }

    /// Entries of one record
    #[must_use]
    pub fn entries_for(&self, deployment: DeploymentId) -> Vec<JournalEntry> {
        self.inner
            .lock()
            .iter()
            .filter(|e| e.deployment == deployment)
            .cloned()
            .collect()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// No entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Check every link and hash
    pub fn verify_integrity(&self) -> Result<(), JournalError> {
        verify_chain(&self.inner.lock())
    }
}

/// Verify a chain of entries, e.g. one read back from an export
pub fn verify_chain(entries: &[JournalEntry]) -> Result<(), JournalError> {
    let mut prev = hex::encode(GENESIS);
    for e in entries {
        if e.prev_hash != prev {
            return Err(JournalError::BrokenLink { seq: e.seq });
        }
        if e.hash != hex::encode(compute_hash(e)) {
            return Err(JournalError::Tampered { seq: e.seq });
        }
        prev.clone_from(&e.hash);
    }
    Ok(())
}

fn compute_hash(entry: &JournalEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.seq.to_le_bytes());
    hasher.update(entry.at.timestamp_micros().to_le_bytes());
    hasher.update(entry.deployment.0.to_bytes());
    hasher.update(entry.device.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(entry.from.map_or("", DeploymentState::as_str).as_bytes());
    hasher.update([0]);
    hasher.update(entry.to.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(entry.note.as_bytes());
    hasher.update([0]);
    hasher.update(entry.prev_hash.as_bytes());
    hasher.finalize().into()
}
