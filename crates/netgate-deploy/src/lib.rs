//! Netgate Deploy - the deployment orchestrator
//!
//! The [`DeploymentOrchestrator`] is the only stateful actor in netgate. It
//! verifies a candidate, diffs it against the device's current snapshot,
//! previews it, pushes it through an atomic [`Repository::swap_current`],
//! probes health and restores the backup when the probe does not come back
//! healthy in time.
//!
//! # Example
//!
//! ```rust,ignore
//! use netgate_deploy::{DeploymentOrchestrator, InMemoryRepository};
//! use netgate_model::{DeployOptions, DeviceId};
//!
//! let orchestrator = DeploymentOrchestrator::new(repo, probe);
//! let record = orchestrator
//!     .deploy(&DeviceId::new("edge-01"), candidate, DeployOptions::default())
//!     .await?;
//! println!("{}", record.preview().unwrap_or_default());
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod health;
pub mod journal;
pub mod leases;
pub mod orchestrator;
pub mod repository;

pub use config::DeployConfig;
pub use error::{DeployError, RepositoryError};
pub use health::{HealthProbe, HealthSignal, ProbeError};
pub use journal::{verify_chain, JournalEntry, JournalError, TransitionJournal};
pub use leases::{DeviceLease, DeviceLeases};
pub use orchestrator::{DeploymentOrchestrator, InvalidRevision, RecoveryReport, Revision};
pub use repository::{
    FileRepository, InMemoryRepository, Repository, RepositoryState, LOCK_FILE, STATE_FILE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
