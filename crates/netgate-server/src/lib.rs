//! Netgate Server - tool surface and process wiring
//!
//! Assembles the engines from a [`NetgateConfig`], exposes them as tools
//! through [`ToolService`] and runs the JSON-lines loop behind
//! `netgate serve`: one [`ToolCall`] per input line, one [`ToolResponse`]
//! per output line.
//!
//! # Example
//!
//! ```rust,ignore
//! let server = netgate_server::bootstrap(&NetgateConfig::load(None)?)?;
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! netgate_server::serve_lines(&server.service, stdin, tokio::io::stdout()).await?;
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod requests;
pub mod tools;

pub use config::{ConfigError, LogFormat, NetgateConfig, DEFAULT_CONFIG_FILE};
pub use error::BootstrapError;
pub use inventory::{
    InterfaceState, InventoryDevice, InventoryError, InventoryProvider, LiveStateProvider,
    StaticLiveState, TopologyHealthProbe, YamlInventory,
};
pub use tools::{schemas, ToolCall, ToolResponse, ToolService, ToolStatus, TOOLS};

use netgate_analysis::StaticAnalysisEngine;
use netgate_audit::{ComplianceAuditor, RulesetCatalog, VulnerabilityDatabase};
use netgate_deploy::{
    DeployConfig, DeploymentOrchestrator, FileRepository, RecoveryReport, Repository,
};
use netgate_validator::ConfigValidator;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Assembled service plus what startup recovery did
#[derive(Debug)]
pub struct NetgateServer {
    /// Tool front end
    pub service: ToolService,
    /// Interrupted deployments resolved at startup
    pub recovery: RecoveryReport,
}

/// Register inventory devices the repository does not know yet.
///
/// Known devices keep their stored current snapshot. Returns how many were
/// added.
pub fn seed_repository(repo: &dyn Repository, inventory: &YamlInventory) -> Result<usize, BootstrapError> {
    let mut added = 0;
    for device in inventory.to_devices()? {
        if repo.device(device.id()).is_ok() {
            continue;
        }
        debug!(device = %device.id(), "registering device from inventory");
        repo.register(device)?;
        added += 1;
    }
    Ok(added)
}

/// Build the service from configuration and resolve interrupted deployments.
///
/// Without an inventory the live state is empty, so the health probe cannot
/// confirm any device and real deployments with `auto_rollback` roll back.
pub fn bootstrap(config: &NetgateConfig) -> Result<NetgateServer, BootstrapError> {
    let repo = Arc::new(FileRepository::open(&config.state_dir)?);
    let inventory = match &config.inventory {
        Some(path) => YamlInventory::load(path)?,
        None => YamlInventory::default(),
    };
    let added = seed_repository(repo.as_ref(), &inventory)?;

    let live = Arc::new(StaticLiveState::from_inventory(&inventory));
    let probe = Arc::new(TopologyHealthProbe::new(Arc::new(inventory), live));

    let validator = Arc::new(ConfigValidator::default());
    let analysis = StaticAnalysisEngine::default().with_timeout(config.analysis_timeout());
    let orchestrator = Arc::new(
        DeploymentOrchestrator::new(repo.clone(), probe)
            .with_validator(validator.clone())
            .with_analysis(analysis.clone())
            .with_config(DeployConfig::new().with_health_timeout(config.health_timeout())),
    );

    let vulnerabilities = match &config.vulnerability_db {
        Some(path) => VulnerabilityDatabase::load(path)?,
        None => VulnerabilityDatabase::builtin(),
    };
    let mut catalog = RulesetCatalog::default();
    for path in &config.rulesets {
        let name = catalog.load_file(path)?;
        debug!(ruleset = %name, path = %path.display(), "ruleset loaded");
    }
    let auditor = Arc::new(ComplianceAuditor::new(catalog, vulnerabilities));

    let recovery = orchestrator.recover()?;
    info!(
        state = %repo.path().display(),
        devices = orchestrator.devices().len(),
        added,
        recovered = recovery.rolled_back.len() + recovery.failed.len(),
        "netgate ready"
    );
    Ok(NetgateServer {
        service: ToolService::new(validator, analysis, orchestrator, auditor),
        recovery,
    })
}

/// Serve tool calls until `input` ends.
///
/// Blank lines are skipped. A line that is not a [`ToolCall`] gets a `failed`
/// response; the loop only stops on I/O errors.
pub async fn serve_lines<R, W>(service: &ToolService, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut served = 0_u64;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ToolCall>(line) {
            Ok(call) => service.dispatch(call).await,
            Err(e) => ToolResponse::failed(format!("invalid tool call: {e}")),
        };
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        output.write_all(encoded.as_bytes()).await?;
        output.flush().await?;
        served += 1;
    }
    info!(served, "input closed");
    Ok(())
}
