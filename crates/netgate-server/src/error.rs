//! Startup errors
//!
//! Tool calls never fail with `Err`; only building the service can.

use crate::config::ConfigError;
use crate::inventory::InventoryError;
use netgate_audit::AuditError;
use netgate_deploy::{DeployError, RepositoryError};

/// Errors raised while assembling the service
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// State directory could not be opened
    #[error("state: {0}")]
    Repository(#[from] RepositoryError),

    /// Inventory could not be loaded
    #[error("inventory: {0}")]
    Inventory(#[from] InventoryError),

    /// Rulesets or vulnerability data could not be loaded
    #[error("audit data: {0}")]
    Audit(#[from] AuditError),

    /// Recovery of interrupted deployments failed
    #[error("recovery: {0}")]
    Recovery(#[from] DeployError),
}
