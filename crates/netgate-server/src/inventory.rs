//! Inventory, topology and live state providers
//!
//! netgate consumes inventory and live health read-only through
//! [`InventoryProvider`] and [`LiveStateProvider`]. The bundled
//! implementations are seeded from one YAML file:
//!
//! ```yaml
//! devices:
//!   - name: edge-01
//!     dialect: cisco_ios
//!     os_version: "16.03.01"
//!     config_file: configs/edge-01.cfg
//!     interfaces:
//!       - { name: GigabitEthernet0/0, up: true }
//! links:
//!   - [edge-01, core-01]
//! ```

use async_trait::async_trait;
use netgate_deploy::{HealthProbe, HealthSignal, ProbeError};
use netgate_model::{Device, DeviceId, Dialect};
use parking_lot::RwLock;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Inventory errors
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML
    #[error("invalid inventory: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Device declared twice
    #[error("device '{0}' declared twice")]
    DuplicateDevice(String),

    /// Link names an undeclared device
    #[error("link references unknown device '{0}'")]
    UnknownLinkEnd(String),

    /// Device declares no running configuration
    #[error("device '{0}' has neither running_config nor config_file")]
    MissingConfig(String),
}

/// Interface as declared or observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceState {
    /// Interface name
    pub name: String,
    /// Operational status
    #[serde(default = "default_up")]
    pub up: bool,
}

fn default_up() -> bool {
    true
}

/// Device entry of the inventory file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDevice {
    /// Hostname
    pub name: String,
    /// Configuration dialect
    pub dialect: Dialect,
    /// OS version tag
    #[serde(default)]
    pub os_version: Option<String>,
    /// Inline running configuration
    #[serde(default)]
    pub running_config: Option<String>,
    /// Running configuration file, relative to the inventory file
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    /// Interfaces and their state
    #[serde(default)]
    pub interfaces: Vec<InterfaceState>,
    /// Whether the device answers
    #[serde(default = "default_up")]
    pub reachable: bool,
}

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    devices: Vec<InventoryDevice>,
    #[serde(default)]
    links: Vec<(String, String)>,
}

/// Source of declared devices and topology
pub trait InventoryProvider: Send + Sync {
    /// Declared devices, sorted by name
    fn devices(&self) -> Vec<InventoryDevice>;

    /// Topology neighbours of a device
    fn neighbors(&self, device: &DeviceId) -> Vec<DeviceId>;
}

/// Source of live interface and reachability state
#[async_trait]
pub trait LiveStateProvider: Send + Sync {
    /// Interfaces of a device
    async fn interfaces(&self, device: &DeviceId) -> Result<Vec<InterfaceState>, ProbeError>;

    /// Whether a device answers
    async fn is_reachable(&self, device: &DeviceId) -> Result<bool, ProbeError>;
}

/// Inventory loaded from YAML with an undirected link graph
#[derive(Debug, Clone, Default)]
pub struct YamlInventory {
    devices: BTreeMap<DeviceId, InventoryDevice>,
    graph: UnGraph<DeviceId, ()>,
    nodes: HashMap<DeviceId, NodeIndex>,
    base_dir: PathBuf,
}

impl YamlInventory {
    /// Load an inventory file
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&text, base_dir)
    }

    /// Parse inventory text; `config_file` entries resolve against `base_dir`
    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, InventoryError> {
        let file: InventoryFile = serde_yaml::from_str(text)?;
        let mut inventory = Self {
            base_dir: base_dir.into(),
            ..Self::default()
        };
        for device in file.devices {
            let id = DeviceId::new(device.name.clone());
            if inventory.devices.contains_key(&id) {
                return Err(InventoryError::DuplicateDevice(device.name));
            }
            let node = inventory.graph.add_node(id.clone());
            inventory.nodes.insert(id.clone(), node);
            inventory.devices.insert(id, device);
        }
        for (a, b) in file.links {
            let left = inventory.node(&a)?;
            let right = inventory.node(&b)?;
            inventory.graph.update_edge(left, right, ());
        }
        Ok(inventory)
    }

    fn node(&self, name: &str) -> Result<NodeIndex, InventoryError> {
        self.nodes
            .get(&DeviceId::new(name))
            .copied()
            .ok_or_else(|| InventoryError::UnknownLinkEnd(name.to_string()))
    }

    /// Number of links
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Build [`Device`]s with their running configuration
    pub fn to_devices(&self) -> Result<Vec<Device>, InventoryError> {
        self.devices
            .iter()
            .map(|(id, entry)| {
                let running = match (&entry.running_config, &entry.config_file) {
                    (Some(text), _) => text.clone(),
                    (None, Some(file)) => {
                        let path = self.base_dir.join(file);
                        std::fs::read_to_string(&path)
                            .map_err(|source| InventoryError::Io { path, source })?
                    }
                    (None, None) => return Err(InventoryError::MissingConfig(entry.name.clone())),
                };
                let device = Device::new(id.clone(), entry.dialect, running);
                Ok(match &entry.os_version {
                    Some(version) => device.with_os_version(version.clone()),
                    None => device,
                })
            })
            .collect()
    }
}

impl InventoryProvider for YamlInventory {
    fn devices(&self) -> Vec<InventoryDevice> {
        self.devices.values().cloned().collect()
    }

    fn neighbors(&self, device: &DeviceId) -> Vec<DeviceId> {
        let Some(&node) = self.nodes.get(device) else {
            return Vec::new();
        };
        let mut out: Vec<DeviceId> = self
            .graph
            .neighbors(node)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }
}

#[derive(Debug, Clone)]
struct LiveDevice {
    interfaces: Vec<InterfaceState>,
    reachable: bool,
}

/// Live state held in memory, seeded from the inventory
#[derive(Debug, Default)]
pub struct StaticLiveState {
    devices: RwLock<HashMap<DeviceId, LiveDevice>>,
}

impl StaticLiveState {
    /// Seed from declared devices
    #[must_use]
    pub fn from_inventory(inventory: &dyn InventoryProvider) -> Self {
        let devices = inventory
            .devices()
            .into_iter()
            .map(|d| {
                (
                    DeviceId::new(d.name),
                    LiveDevice {
                        interfaces: d.interfaces,
                        reachable: d.reachable,
                    },
                )
            })
            .collect();
        Self {
            devices: RwLock::new(devices),
        }
    }

    /// Change an interface's status; returns false if it is unknown
    pub fn set_interface(&self, device: &DeviceId, interface: &str, up: bool) -> bool {
        let mut devices = self.devices.write();
        let Some(iface) = devices
            .get_mut(device)
            .and_then(|d| d.interfaces.iter_mut().find(|i| i.name == interface))
        else {
            return false;
        };
        iface.up = up;
        true
    }

    /// Change a device's reachability; returns false if it is unknown
    pub fn set_reachable(&self, device: &DeviceId, reachable: bool) -> bool {
        match self.devices.write().get_mut(device) {
            Some(d) => {
                d.reachable = reachable;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl LiveStateProvider for StaticLiveState {
    async fn interfaces(&self, device: &DeviceId) -> Result<Vec<InterfaceState>, ProbeError> {
        self.devices
            .read()
            .get(device)
            .map(|d| d.interfaces.clone())
            .ok_or_else(|| ProbeError(format!("no live state for {device}")))
    }

    async fn is_reachable(&self, device: &DeviceId) -> Result<bool, ProbeError> {
        self.devices
            .read()
            .get(device)
            .map(|d| d.reachable)
            .ok_or_else(|| ProbeError(format!("no live state for {device}")))
    }
}

/// Healthy iff every interface of the device is up and every topology
/// neighbour is reachable
pub struct TopologyHealthProbe {
    inventory: Arc<dyn InventoryProvider>,
    live: Arc<dyn LiveStateProvider>,
}

impl std::fmt::Debug for TopologyHealthProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyHealthProbe").finish_non_exhaustive()
    }
}

impl TopologyHealthProbe {
    /// Probe over providers
    #[must_use]
    pub fn new(inventory: Arc<dyn InventoryProvider>, live: Arc<dyn LiveStateProvider>) -> Self {
        Self { inventory, live }
    }
}

#[async_trait]
impl HealthProbe for TopologyHealthProbe {
    async fn check(&self, device: &Device) -> Result<HealthSignal, ProbeError> {
        let down: Vec<String> = self
            .live
            .interfaces(device.id())
            .await?
            .into_iter()
            .filter(|i| !i.up)
            .map(|i| i.name)
            .collect();
        if !down.is_empty() {
            return Ok(HealthSignal::unhealthy(format!(
                "interface(s) down on {}: {}",
                device.id(),
                down.join(", ")
            )));
        }

        let mut unreachable = Vec::new();
        for neighbor in self.inventory.neighbors(device.id()) {
            if !self.live.is_reachable(&neighbor).await? {
                unreachable.push(neighbor.to_string());
            }
        }
        if !unreachable.is_empty() {
            return Ok(HealthSignal::unhealthy(format!(
                "neighbour(s) unreachable from {}: {}",
                device.id(),
                unreachable.join(", ")
            )));
        }
        Ok(HealthSignal::Healthy)
    }
}
