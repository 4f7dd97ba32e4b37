// Nexus Engine
//
// Wallet provisioning core: the identity registry, the deployment
// orchestrator, the gas tank ledger service, and the cross-chain
// correlator, assembled behind the `NexusService` facade.

pub mod config;
pub mod correlator;
pub mod error;
pub mod gas_tank;
pub mod orchestrator;
pub mod registry;
pub mod service;

pub use config::EngineConfig;
pub use correlator::CrossChainCorrelator;
pub use error::{EngineError, EngineResult};
pub use gas_tank::{Authorization, GasTank};
pub use orchestrator::{DeploymentOrchestrator, DeploymentOutcome, OrchestratorSettings};
pub use registry::WalletRegistry;
pub use service::{NexusService, WalletView};

/// Install the default tracing subscriber, filtered through `RUST_LOG`.
/// Call once at process start; later calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
