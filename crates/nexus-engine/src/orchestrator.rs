// Deployment orchestrator
//
// Drives a wallet from predicted address to live contract, idempotently
// and with at most one in-flight deployment transaction per identity and
// chain. The orchestrator is the only mutator of per-chain deployment
// state; the per-key lease serializes workers racing on the same wallet
// across horizontally scaled instances.

use std::sync::Arc;

use tracing::{info, warn};

use nexus_chain::{retry_with_backoff, BackoffPolicy, ChainAdapter, ChainAdapterRegistry, GasPolicy};
use nexus_error::{RegistryError, Retryable};
use nexus_store::{LeaseStore, LeaseToken};
use nexus_types::{Address, ChainFamily, ChainId, DeploymentStatus, IdentityKey, TxRef};

use crate::error::EngineResult;
use crate::registry::WalletRegistry;

/// Tunables for the deployment flow
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Deployment attempts per chain before `DeploymentExhausted`
    pub max_attempts: u32,
    pub lease_ttl: std::time::Duration,
    /// How long one confirmation wait may take
    pub confirmation_timeout: std::time::Duration,
    pub backoff: BackoffPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lease_ttl: std::time::Duration::from_secs(60),
            confirmation_timeout: std::time::Duration::from_secs(120),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// What `ensure_deployed` observed or caused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub address: Address,
    pub status: DeploymentStatus,
    pub tx_ref: Option<TxRef>,
}

pub struct DeploymentOrchestrator {
    registry: Arc<WalletRegistry>,
    chains: Arc<ChainAdapterRegistry>,
    leases: Arc<dyn LeaseStore>,
    settings: OrchestratorSettings,
}

impl DeploymentOrchestrator {
    pub fn new(
        registry: Arc<WalletRegistry>,
        chains: Arc<ChainAdapterRegistry>,
        leases: Arc<dyn LeaseStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            registry,
            chains,
            leases,
            settings,
        }
    }

    /// Make sure the identity's wallet is (or is becoming) live on `chain`.
    ///
    /// Already-deployed wallets return immediately with no chain-mutating
    /// call. A pending deployment is polled, never resubmitted. Otherwise
    /// the wallet's on-chain liveness is re-queried first: a wallet that
    /// went live under a submission this process never saw (crash before
    /// confirmation) is adopted without a second transaction. Only then is
    /// a deployment broadcast, persisted as pending, and confirmed in the
    /// background.
    pub async fn ensure_deployed(
        &self,
        identity: &IdentityKey,
        chain: &ChainId,
        gas_policy: GasPolicy,
    ) -> EngineResult<DeploymentOutcome> {
        let adapter = self.chains.adapter(chain)?;
        let family = adapter.family();
        let record = self.registry.get_or_create(identity, family).await?;
        let deployment = record.deployment(chain);
        let address = record.predicted_address.clone();

        if deployment.status == DeploymentStatus::Deployed {
            return Ok(DeploymentOutcome {
                address,
                status: DeploymentStatus::Deployed,
                tx_ref: deployment.tx_ref,
            });
        }

        let lease_key = lease_key(chain, identity);
        let token = match self
            .leases
            .acquire_lease(&lease_key, self.settings.lease_ttl)
            .await
        {
            Ok(token) => token,
            Err(RegistryError::LeaseHeld(_)) => {
                // another worker is driving this deployment; report what
                // the record currently says
                return Ok(DeploymentOutcome {
                    address,
                    status: deployment.status,
                    tx_ref: deployment.tx_ref,
                });
            }
            Err(err) => return Err(err.into()),
        };

        let (result, lease_handed_off) = self
            .drive(identity, family, chain, &adapter, gas_policy, token)
            .await;
        if !lease_handed_off {
            self.leases.release_lease(&lease_key, token).await;
        }
        result
    }

    /// The deployment flow proper, entered holding the lease. Returns the
    /// outcome and whether the lease was handed to a confirmation watcher.
    async fn drive(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
        chain: &ChainId,
        adapter: &Arc<dyn ChainAdapter>,
        gas_policy: GasPolicy,
        token: LeaseToken,
    ) -> (EngineResult<DeploymentOutcome>, bool) {
        // re-read under the lease; the record may have moved while racing
        let record = match self.registry.get(identity, family).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return (
                    Err(RegistryError::wallet_not_found(identity.as_str()).into()),
                    false,
                )
            }
            Err(err) => return (Err(err), false),
        };
        let deployment = record.deployment(chain);
        let address = record.predicted_address.clone();

        match deployment.status {
            DeploymentStatus::Deployed => (
                Ok(DeploymentOutcome {
                    address,
                    status: DeploymentStatus::Deployed,
                    tx_ref: deployment.tx_ref,
                }),
                false,
            ),
            DeploymentStatus::Pending => {
                let tx_ref = deployment.tx_ref.clone();
                let result = self
                    .resolve_pending(identity, family, chain, adapter, &address, tx_ref.as_ref())
                    .await
                    .map(|status| DeploymentOutcome {
                        address,
                        status,
                        tx_ref,
                    });
                (result, false)
            }
            DeploymentStatus::NotDeployed | DeploymentStatus::Failed => {
                if deployment.status == DeploymentStatus::Failed
                    && deployment.attempts >= self.settings.max_attempts
                {
                    return (
                        Err(RegistryError::DeploymentExhausted {
                            attempts: deployment.attempts,
                            detail: format!("{identity} on {chain}"),
                        }
                        .into()),
                        false,
                    );
                }
                self.submit(identity, family, chain, adapter, record, gas_policy, token)
                    .await
            }
        }
    }

    /// Broadcast a new deployment and hand confirmation to a background
    /// watcher, which also inherits the lease
    #[allow(clippy::too_many_arguments)]
    async fn submit(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
        chain: &ChainId,
        adapter: &Arc<dyn ChainAdapter>,
        record: nexus_types::WalletRecord,
        gas_policy: GasPolicy,
        token: LeaseToken,
    ) -> (EngineResult<DeploymentOutcome>, bool) {
        let address = record.predicted_address.clone();

        // crash recovery: the wallet may be live even though no pending
        // submission survived in the record
        match adapter.is_deployed(&address).await {
            Ok(true) => {
                let result = self
                    .mark_deployed(identity, family, chain, None)
                    .await
                    .map(|_| DeploymentOutcome {
                        address,
                        status: DeploymentStatus::Deployed,
                        tx_ref: None,
                    });
                return (result, false);
            }
            Ok(false) => {}
            Err(err) => return (Err(err.into()), false),
        }

        let owner = record.owner_public_key.clone();
        let salt = record.deployment_salt;
        let broadcast = retry_with_backoff(&self.settings.backoff, "deploy", || {
            adapter.deploy(&owner, &salt, &gas_policy)
        })
        .await;

        let tx_ref = match broadcast {
            Ok(tx_ref) => tx_ref,
            Err(err) => {
                // persist the failed attempt so the cap can take effect
                let persisted = async {
                    self.registry
                        .update_deployment_status(
                            identity,
                            family,
                            chain,
                            DeploymentStatus::Pending,
                            None,
                        )
                        .await?;
                    self.registry
                        .update_deployment_status(
                            identity,
                            family,
                            chain,
                            DeploymentStatus::Failed,
                            None,
                        )
                        .await
                }
                .await;
                if let Err(update_err) = persisted {
                    warn!(identity = %identity, chain = %chain, error = %update_err, "failed to persist deployment failure");
                }
                warn!(identity = %identity, chain = %chain, error = %err, "deployment broadcast failed");
                return (Err(err.into()), false);
            }
        };

        if let Err(err) = self
            .registry
            .update_deployment_status(
                identity,
                family,
                chain,
                DeploymentStatus::Pending,
                Some(tx_ref.clone()),
            )
            .await
        {
            return (Err(err), false);
        }
        info!(identity = %identity, chain = %chain, address = %address, tx = %tx_ref, "deployment submitted");

        let registry = self.registry.clone();
        let leases = self.leases.clone();
        let adapter = adapter.clone();
        let settings = self.settings.clone();
        let identity = identity.clone();
        let chain = chain.clone();
        let watch_address = address.clone();
        let watch_tx = tx_ref.clone();
        tokio::spawn(async move {
            let key = lease_key(&chain, &identity);
            let status = resolve_pending(
                &registry,
                &settings,
                &identity,
                family,
                &chain,
                &adapter,
                &watch_address,
                Some(&watch_tx),
            )
            .await;
            if let Err(err) = status {
                warn!(identity = %identity, chain = %chain, tx = %watch_tx, error = %err, "confirmation watcher failed");
            }
            leases.release_lease(&key, token).await;
        });

        (
            Ok(DeploymentOutcome {
                address,
                status: DeploymentStatus::Pending,
                tx_ref: Some(tx_ref),
            }),
            true,
        )
    }

    async fn resolve_pending(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
        chain: &ChainId,
        adapter: &Arc<dyn ChainAdapter>,
        address: &Address,
        tx_ref: Option<&TxRef>,
    ) -> EngineResult<DeploymentStatus> {
        resolve_pending(
            &self.registry,
            &self.settings,
            identity,
            family,
            chain,
            adapter,
            address,
            tx_ref,
        )
        .await
    }

    async fn mark_deployed(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
        chain: &ChainId,
        tx_ref: Option<TxRef>,
    ) -> EngineResult<()> {
        mark_deployed(&self.registry, identity, family, chain, tx_ref).await
    }
}

fn lease_key(chain: &ChainId, identity: &IdentityKey) -> String {
    format!("deploy:{chain}:{identity}")
}

/// Settle a pending deployment: the chain is consulted first, then the
/// transaction is awaited. Ambiguous timeouts re-query liveness before the
/// record is allowed to move.
#[allow(clippy::too_many_arguments)]
async fn resolve_pending(
    registry: &Arc<WalletRegistry>,
    settings: &OrchestratorSettings,
    identity: &IdentityKey,
    family: ChainFamily,
    chain: &ChainId,
    adapter: &Arc<dyn ChainAdapter>,
    address: &Address,
    tx_ref: Option<&TxRef>,
) -> EngineResult<DeploymentStatus> {
    if adapter.is_deployed(address).await? {
        mark_deployed(registry, identity, family, chain, None).await?;
        return Ok(DeploymentStatus::Deployed);
    }

    let tx_ref = match tx_ref {
        Some(tx_ref) => tx_ref,
        // pending with no surviving tx ref and no code on chain: the
        // submission never happened, clear the slot for a retry
        None => {
            registry
                .update_deployment_status(identity, family, chain, DeploymentStatus::Failed, None)
                .await?;
            return Ok(DeploymentStatus::Failed);
        }
    };

    let waited = retry_with_backoff(&settings.backoff, "wait_for_confirmation", || {
        adapter.wait_for_confirmation(tx_ref, settings.confirmation_timeout)
    })
    .await;

    match waited {
        Ok(outcome) if outcome.success => {
            mark_deployed(registry, identity, family, chain, Some(tx_ref.clone())).await?;
            info!(identity = %identity, chain = %chain, tx = %tx_ref, "wallet deployed");
            Ok(DeploymentStatus::Deployed)
        }
        Ok(outcome) => {
            registry
                .update_deployment_status(identity, family, chain, DeploymentStatus::Failed, None)
                .await?;
            warn!(
                identity = %identity,
                chain = %chain,
                tx = %tx_ref,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "deployment reverted"
            );
            Ok(DeploymentStatus::Failed)
        }
        Err(err) if err.needs_requery() => {
            // the timeout left the outcome ambiguous; chain state decides
            if adapter.is_deployed(address).await? {
                mark_deployed(registry, identity, family, chain, Some(tx_ref.clone())).await?;
                Ok(DeploymentStatus::Deployed)
            } else {
                registry
                    .update_deployment_status(
                        identity,
                        family,
                        chain,
                        DeploymentStatus::Failed,
                        None,
                    )
                    .await?;
                warn!(identity = %identity, chain = %chain, tx = %tx_ref, "confirmation timed out");
                Ok(DeploymentStatus::Failed)
            }
        }
        Err(err) => Err(err.into()),
    }
}

async fn mark_deployed(
    registry: &Arc<WalletRegistry>,
    identity: &IdentityKey,
    family: ChainFamily,
    chain: &ChainId,
    tx_ref: Option<TxRef>,
) -> EngineResult<()> {
    let record = registry
        .get(identity, family)
        .await?
        .ok_or_else(|| RegistryError::wallet_not_found(identity.as_str()))?;
    // adoption of an externally completed deployment passes through
    // pending so the transition rules hold
    if record.status(chain) == DeploymentStatus::NotDeployed
        || record.status(chain) == DeploymentStatus::Failed
    {
        registry
            .update_deployment_status(identity, family, chain, DeploymentStatus::Pending, None)
            .await?;
    }
    registry
        .update_deployment_status(identity, family, chain, DeploymentStatus::Deployed, tx_ref)
        .await?;
    Ok(())
}
