//! Device and deployment record storage
//!
//! [`Repository::swap_current`] is the only way a device's current snapshot
//! changes. It compares the stored current hash with the caller's expectation,
//! replaces the snapshot and stores the record in one step, so readers never
//! see a new current without the record that explains it.

use crate::error::RepositoryError;
use netgate_model::{ConfigurationSnapshot, ContentHash, DeploymentId, DeploymentRecord, Device, DeviceId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the state document inside the state directory
pub const STATE_FILE: &str = "netgate-state.json";

/// Lock file guarding the state directory against a second process
pub const LOCK_FILE: &str = "netgate.lock";

/// Storage for devices and deployment records
pub trait Repository: Send + Sync {
    /// Register a new device
    fn register(&self, device: Device) -> Result<(), RepositoryError>;

    /// Device by id
    fn device(&self, id: &DeviceId) -> Result<Device, RepositoryError>;

    /// All devices, sorted by id
    fn devices(&self) -> Vec<Device>;

    /// Insert or update a record and append it to the device's history
    fn save_record(&self, record: &DeploymentRecord) -> Result<(), RepositoryError>;

    /// Record by id
    fn record(&self, id: DeploymentId) -> Option<DeploymentRecord>;

    /// Records of a device in history order
    fn records_for(&self, device: &DeviceId) -> Vec<DeploymentRecord>;

    /// Records not yet terminal
    fn open_records(&self) -> Vec<DeploymentRecord>;

    /// Replace the current snapshot if it still hashes to `expected`, storing
    /// `record` in the same step. Returns the replaced snapshot.
    fn swap_current(
        &self,
        device: &DeviceId,
        expected: &ContentHash,
        next: ConfigurationSnapshot,
        record: &DeploymentRecord,
    ) -> Result<ConfigurationSnapshot, RepositoryError>;

    /// Mark a device degraded
    fn mark_degraded(&self, device: &DeviceId, reason: &str) -> Result<(), RepositoryError>;

    /// Clear a degraded marker
    fn clear_degraded(&self, device: &DeviceId) -> Result<(), RepositoryError>;
}

/// In-memory state shared by the bundled repositories
#[derive(Debug, Clone, Default)]
pub struct RepositoryState {
    devices: BTreeMap<DeviceId, Device>,
    records: BTreeMap<DeploymentId, DeploymentRecord>,
}

/// On-disk form of [`RepositoryState`]
#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    devices: Vec<Device>,
    records: Vec<DeploymentRecord>,
}

impl RepositoryState {
    fn device_mut(&mut self, id: &DeviceId) -> Result<&mut Device, RepositoryError> {
        self.devices
            .get_mut(id)
            .ok_or_else(|| RepositoryError::UnknownDevice(id.clone()))
    }

    fn register(&mut self, device: Device) -> Result<(), RepositoryError> {
        if self.devices.contains_key(device.id()) {
            return Err(RepositoryError::DuplicateDevice(device.id().clone()));
        }
        self.devices.insert(device.id().clone(), device);
        Ok(())
    }

    fn device(&self, id: &DeviceId) -> Result<Device, RepositoryError> {
        self.devices
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::UnknownDevice(id.clone()))
    }

    fn save_record(&mut self, record: &DeploymentRecord) -> Result<(), RepositoryError> {
        self.device_mut(record.device())?
            .record_deployment(record.id());
        self.records.insert(record.id(), record.clone());
        Ok(())
    }

    fn records_for(&self, id: &DeviceId) -> Vec<DeploymentRecord> {
        self.devices.get(id).map_or_else(Vec::new, |device| {
            device
                .history()
                .iter()
                .filter_map(|rid| self.records.get(rid).cloned())
                .collect()
        })
    }

    fn open_records(&self) -> Vec<DeploymentRecord> {
        self.records
            .values()
            .filter(|r| !r.is_terminal())
            .cloned()
            .collect()
    }

    fn swap_current(
        &mut self,
        id: &DeviceId,
        expected: &ContentHash,
        next: ConfigurationSnapshot,
        record: &DeploymentRecord,
    ) -> Result<ConfigurationSnapshot, RepositoryError> {
        if record.device() != id {
            return Err(RepositoryError::RecordMismatch {
                record: record.id(),
                owner: record.device().clone(),
                device: id.clone(),
            });
        }
        let device = self.device_mut(id)?;
        let actual = *device.current().hash();
        if actual != *expected {
            return Err(RepositoryError::StaleCurrent {
                device: id.clone(),
                expected: *expected,
                actual,
            });
        }
        let previous = device.replace_current(next);
        device.record_deployment(record.id());
        self.records.insert(record.id(), record.clone());
        Ok(previous)
    }

    fn to_document(&self) -> StateDocument {
        StateDocument {
            devices: self.devices.values().cloned().collect(),
            records: self.records.values().cloned().collect(),
        }
    }

    fn from_document(doc: StateDocument) -> Self {
        Self {
            devices: doc
                .devices
                .into_iter()
                .map(|d| (d.id().clone(), d))
                .collect(),
            records: doc.records.into_iter().map(|r| (r.id(), r)).collect(),
        }
    }
}

/// Volatile repository
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<RepositoryState>,
}

impl InMemoryRepository {
    /// Empty repository
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository seeded with devices
    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Result<Self, RepositoryError> {
        let repo = Self::new();
        for device in devices {
            repo.register(device)?;
        }
        Ok(repo)
    }
}

impl Repository for InMemoryRepository {
    fn register(&self, device: Device) -> Result<(), RepositoryError> {
        self.state.write().register(device)
    }

    fn device(&self, id: &DeviceId) -> Result<Device, RepositoryError> {
        self.state.read().device(id)
    }

    fn devices(&self) -> Vec<Device> {
        self.state.read().devices.values().cloned().collect()
    }

    fn save_record(&self, record: &DeploymentRecord) -> Result<(), RepositoryError> {
        self.state.write().save_record(record)
    }

    fn record(&self, id: DeploymentId) -> Option<DeploymentRecord> {
        self.state.read().records.get(&id).cloned()
    }

    fn records_for(&self, device: &DeviceId) -> Vec<DeploymentRecord> {
        self.state.read().records_for(device)
    }

    fn open_records(&self) -> Vec<DeploymentRecord> {
        self.state.read().open_records()
    }

    fn swap_current(
        &self,
        device: &DeviceId,
        expected: &ContentHash,
        next: ConfigurationSnapshot,
        record: &DeploymentRecord,
    ) -> Result<ConfigurationSnapshot, RepositoryError> {
        self.state.write().swap_current(device, expected, next, record)
    }

    fn mark_degraded(&self, device: &DeviceId, reason: &str) -> Result<(), RepositoryError> {
        self.state.write().device_mut(device)?.mark_degraded(reason);
        Ok(())
    }

    fn clear_degraded(&self, device: &DeviceId) -> Result<(), RepositoryError> {
        self.state.write().device_mut(device)?.clear_degraded();
        Ok(())
    }
}

/// Repository persisted as one JSON document
///
/// Every mutation is applied to a draft copy, written to a temporary file in
/// the state directory and renamed over the document. The in-memory state
/// only changes once the rename succeeded.
///
/// The repository holds an exclusive lock on [`LOCK_FILE`] until it is
/// dropped, so one state directory serves one process at a time.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    state: RwLock<RepositoryState>,
    _lock: File,
}

impl FileRepository {
    /// Open the state document in `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| RepositoryError::io_error(dir, e))?;
        let lock = lock_dir(dir)?;
        let path = dir.join(STATE_FILE);

        let state = if path.exists() {
            let text =
                std::fs::read_to_string(&path).map_err(|e| RepositoryError::io_error(&path, e))?;
            let doc: StateDocument =
                serde_json::from_str(&text).map_err(|source| RepositoryError::Corrupt {
                    path: path.clone(),
                    source,
                })?;
            RepositoryState::from_document(doc)
        } else {
            RepositoryState::default()
        };
        debug!(
            path = %path.display(),
            devices = state.devices.len(),
            records = state.records.len(),
            "state file opened"
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
            _lock: lock,
        })
    }

    /// Path of the state document
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &RepositoryState) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(&state.to_document()).map_err(|source| {
            RepositoryError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| RepositoryError::io_error(dir, e))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| RepositoryError::io_error(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| RepositoryError::io_error(&self.path, e.error))?;
        Ok(())
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RepositoryState) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.state.write();
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        self.persist(&draft)?;
        *guard = draft;
        Ok(out)
    }
}

fn lock_dir(dir: &Path) -> Result<File, RepositoryError> {
    let path = dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| RepositoryError::io_error(&path, e))?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(RepositoryError::Locked {
            path: dir.to_path_buf(),
        }),
        Err(e) => Err(RepositoryError::io_error(&path, e)),
    }
}

impl Repository for FileRepository {
    fn register(&self, device: Device) -> Result<(), RepositoryError> {
        self.mutate(|s| s.register(device))
    }

    fn device(&self, id: &DeviceId) -> Result<Device, RepositoryError> {
        self.state.read().device(id)
    }

    fn devices(&self) -> Vec<Device> {
        self.state.read().devices.values().cloned().collect()
    }

    fn save_record(&self, record: &DeploymentRecord) -> Result<(), RepositoryError> {
        self.mutate(|s| s.save_record(record))
    }

    fn record(&self, id: DeploymentId) -> Option<DeploymentRecord> {
        self.state.read().records.get(&id).cloned()
    }

    fn records_for(&self, device: &DeviceId) -> Vec<DeploymentRecord> {
        self.state.read().records_for(device)
    }

    fn open_records(&self) -> Vec<DeploymentRecord> {
        self.state.read().open_records()
    }

    fn swap_current(
        &self,
        device: &DeviceId,
        expected: &ContentHash,
        next: ConfigurationSnapshot,
        record: &DeploymentRecord,
    ) -> Result<ConfigurationSnapshot, RepositoryError> {
        self.mutate(|s| s.swap_current(device, expected, next, record))
    }

    fn mark_degraded(&self, device: &DeviceId, reason: &str) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            s.device_mut(device)?.mark_degraded(reason);
            Ok(())
        })
    }

    fn clear_degraded(&self, device: &DeviceId) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            s.device_mut(device)?.clear_degraded();
            Ok(())
        })
    }
}
