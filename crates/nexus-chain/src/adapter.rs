// Chain adapter trait and factory

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use nexus_error::{ChainError, ChainResult};
use nexus_types::{Address, Amount, BlockRef, ChainFamily, ChainId, OwnerPublicKey, Salt, TxRef};

use crate::config::ChainConfig;

/// Who pays the fees of a deployment transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GasPolicy {
    /// Fees are sponsored by the service's deployer account, optionally
    /// capped. Sponsorship against a company gas tank is authorized by the
    /// ledger before deploy is called.
    Sponsored { max_fee: Option<Amount> },
    /// Fees are paid by a caller-supplied funding account
    UserPaid,
}

impl Default for GasPolicy {
    fn default() -> Self {
        GasPolicy::Sponsored { max_fee: None }
    }
}

/// Outcome of waiting for a transaction confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutcome {
    pub success: bool,
    /// Block where the transaction landed, when known
    pub block: Option<BlockRef>,
    /// Chain-side failure reason for unsuccessful transactions
    pub error: Option<String>,
}

impl TxOutcome {
    pub fn confirmed(block: BlockRef) -> Self {
        Self {
            success: true,
            block: Some(block),
            error: None,
        }
    }

    pub fn reverted(block: Option<BlockRef>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            block,
            error: Some(error.into()),
        }
    }
}

/// Uniform interface over one chain's native RPC.
///
/// `deploy` is the only mutating call and returns at broadcast time;
/// everything else is read-only. `wait_for_confirmation` is cancellable by
/// dropping the returned future — a broadcast transaction cannot be
/// retracted, only the wait is abandonable.
#[async_trait]
pub trait ChainAdapter: Send + Sync + Debug {
    /// The chain this adapter talks to
    fn chain_id(&self) -> &ChainId;

    /// Addressing family the chain belongs to
    fn family(&self) -> ChainFamily;

    /// Predicted smart-wallet address for an owner key and salt.
    ///
    /// Pure computation, no RPC: the address is a function of
    /// `(owner, salt)` and the family's fixed factory parameters, and is
    /// identical for every chain in the family.
    fn predicted_address(&self, owner: &OwnerPublicKey, salt: &Salt) -> ChainResult<Address>;

    /// Whether contract code is live at the address
    async fn is_deployed(&self, address: &Address) -> ChainResult<bool>;

    /// Broadcast the deployment transaction. Returns as soon as the
    /// transaction is accepted by the endpoint; never waits for
    /// confirmation.
    async fn deploy(
        &self,
        owner: &OwnerPublicKey,
        salt: &Salt,
        gas_policy: &GasPolicy,
    ) -> ChainResult<TxRef>;

    /// Poll until the transaction is confirmed or `timeout` elapses.
    /// A timeout is ambiguous: re-query chain state before retrying.
    async fn wait_for_confirmation(
        &self,
        tx_ref: &TxRef,
        timeout: Duration,
    ) -> ChainResult<TxOutcome>;

    /// Estimated fee of a deployment on this chain, in smallest units
    async fn estimate_deployment_cost(&self) -> ChainResult<Amount>;
}

/// Factory trait for creating chain adapters from configuration
#[async_trait]
pub trait ChainAdapterFactory: Send + Sync {
    /// Create a new adapter instance for the given chain
    async fn create_adapter(&self, config: ChainConfig) -> ChainResult<Arc<dyn ChainAdapter>>;

    /// The chain families this factory can build adapters for
    fn supported_families(&self) -> Vec<ChainFamily>;

    fn supports_family(&self, family: ChainFamily) -> bool {
        self.supported_families().contains(&family)
    }
}

/// Look up the factory responsible for a config's family
pub(crate) fn factory_for<'a>(
    factories: &'a [Arc<dyn ChainAdapterFactory>],
    family: ChainFamily,
) -> ChainResult<&'a Arc<dyn ChainAdapterFactory>> {
    factories
        .iter()
        .find(|f| f.supports_family(family))
        .ok_or_else(|| ChainError::UnsupportedChain(format!("no factory for family {family}")))
}
