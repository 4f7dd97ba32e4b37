// Engine facade
//
// One object wiring the registry, orchestrator, gas tank, and correlator
// over a shared store and the configured chain adapters. This is the
// surface the surrounding application calls.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use nexus_chain::{
    BackoffPolicy, ChainAdapterFactory, ChainAdapterRegistry, GasPolicy,
};
use nexus_crypto::{KeyDeriver, MasterKey};
use nexus_error::LedgerError;
use nexus_store::MemoryStore;
use nexus_types::{
    Address, Amount, ChainId, CompanyId, CorrelatedOperation, DeploymentStatus, GasTankAccount,
    IdentityKey, OperationId, TxRef,
};

use crate::config::EngineConfig;
use crate::correlator::CrossChainCorrelator;
use crate::error::EngineResult;
use crate::gas_tank::{Authorization, GasTank};
use crate::orchestrator::{DeploymentOrchestrator, DeploymentOutcome, OrchestratorSettings};
use crate::registry::WalletRegistry;

/// Addresses and per-chain deployment state for one identity across the
/// requested chains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletView {
    pub addresses: HashMap<ChainId, Address>,
    pub per_chain_status: HashMap<ChainId, DeploymentStatus>,
}

pub struct NexusService {
    chains: Arc<ChainAdapterRegistry>,
    registry: Arc<WalletRegistry>,
    orchestrator: DeploymentOrchestrator,
    gas_tank: GasTank,
    correlator: CrossChainCorrelator,
}

impl NexusService {
    /// Build the engine from configuration. All adapters are constructed up
    /// front; a config the factories cannot serve fails here, not at first
    /// use.
    pub async fn from_config(
        config: EngineConfig,
        factories: &[Arc<dyn ChainAdapterFactory>],
    ) -> EngineResult<Self> {
        config.validate()?;
        let master = MasterKey::from_hex(config.master_key_version, &config.master_key_hex)?;
        let deriver = KeyDeriver::new(master);
        let chains = Arc::new(
            ChainAdapterRegistry::from_configs(config.chains.clone(), factories).await?,
        );

        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(WalletRegistry::new(deriver, chains.clone(), store.clone()));
        let settings = OrchestratorSettings {
            max_attempts: config.max_deploy_attempts,
            lease_ttl: config.lease_ttl(),
            confirmation_timeout: config.confirmation_timeout(),
            backoff: BackoffPolicy::default(),
        };
        let orchestrator = DeploymentOrchestrator::new(
            registry.clone(),
            chains.clone(),
            store.clone(),
            settings,
        );
        let gas_tank = GasTank::new(store.clone());
        let correlator = CrossChainCorrelator::new(store, config.stall_after());

        Ok(Self {
            chains,
            registry,
            orchestrator,
            gas_tank,
            correlator,
        })
    }

    /// Resolve (creating on first sight) the identity's wallets for the
    /// requested chains. Addresses are returned synchronously whatever the
    /// deployment state; chains of one family share one address.
    pub async fn wallet_get_or_create(
        &self,
        identity: &IdentityKey,
        chains: &[ChainId],
    ) -> EngineResult<WalletView> {
        let mut addresses = HashMap::new();
        let mut per_chain_status = HashMap::new();
        for chain in chains {
            let family = self.chains.family_of(chain)?;
            let record = self.registry.get_or_create(identity, family).await?;
            addresses.insert(chain.clone(), record.predicted_address.clone());
            per_chain_status.insert(chain.clone(), record.status(chain));
        }
        Ok(WalletView {
            addresses,
            per_chain_status,
        })
    }

    /// Drive deployment on one chain, service-sponsored without a cap
    pub async fn wallet_deploy(
        &self,
        identity: &IdentityKey,
        chain: &ChainId,
    ) -> EngineResult<DeploymentOutcome> {
        self.orchestrator
            .ensure_deployed(identity, chain, GasPolicy::default())
            .await
    }

    /// Deployment paid from a company gas tank: the estimated fee is
    /// authorized and debited before anything is broadcast, and caps the
    /// sponsorship. A deployment that fails to start refunds the debit.
    pub async fn wallet_deploy_sponsored(
        &self,
        company: &CompanyId,
        identity: &IdentityKey,
        chain: &ChainId,
    ) -> EngineResult<DeploymentOutcome> {
        let adapter = self.chains.adapter(chain)?;
        let fee = adapter.estimate_deployment_cost().await?;
        let auth = self
            .gas_tank
            .authorize_and_debit(company, chain, fee, None)
            .await?;
        if !auth.authorized {
            return Err(LedgerError::insufficient(fee.0, auth.remaining_balance.0).into());
        }
        match self
            .orchestrator
            .ensure_deployed(identity, chain, GasPolicy::Sponsored { max_fee: Some(fee) })
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // the debit backed a deployment that never happened
                if let Err(refund_err) = self.gas_tank.refund(company, chain, fee, None).await {
                    warn!(
                        company = %company,
                        chain = %chain,
                        amount = %fee,
                        error = %refund_err,
                        "sponsorship refund failed"
                    );
                }
                Err(err)
            }
        }
    }

    pub async fn gas_tank_fund(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        source_ref: Option<TxRef>,
    ) -> EngineResult<GasTankAccount> {
        self.gas_tank.fund(company, chain, amount, source_ref).await
    }

    pub async fn gas_tank_authorize(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        related_tx: Option<TxRef>,
    ) -> EngineResult<Authorization> {
        self.gas_tank
            .authorize_and_debit(company, chain, amount, related_tx)
            .await
    }

    pub async fn operation_get(&self, id: &OperationId) -> EngineResult<CorrelatedOperation> {
        self.correlator.get(id).await
    }

    pub fn correlator(&self) -> &CrossChainCorrelator {
        &self.correlator
    }

    pub fn gas_tank(&self) -> &GasTank {
        &self.gas_tank
    }

    pub fn registry(&self) -> &Arc<WalletRegistry> {
        &self.registry
    }

    pub fn chains(&self) -> &Arc<ChainAdapterRegistry> {
        &self.chains
    }
}
