// EVM chain adapter

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use nexus_chain::{ChainAdapter, ChainConfig, GasPolicy, TxOutcome};
use nexus_error::{ChainError, ChainResult};
use nexus_types::{Address, Amount, BlockRef, ChainFamily, ChainId, OwnerPublicKey, Salt, TxRef};

use crate::address;
use crate::rpc::{parse_quantity, RpcClient};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxReceipt {
    status: Option<String>,
    block_number: Option<String>,
    block_hash: Option<String>,
}

/// State for dry-run adapters: which predicted addresses have "deployed"
#[derive(Debug, Default)]
struct DryRunState {
    deployed: HashSet<String>,
    in_flight: Vec<(TxRef, Address)>,
}

/// Chain adapter for EVM-family chains.
///
/// Talks plain JSON-RPC to the endpoint; the wallet factory contract and
/// init code hash come from configuration and are shared across every
/// chain of the family.
#[derive(Debug)]
pub struct EvmAdapter {
    config: ChainConfig,
    client: RpcClient,
    factory: [u8; 20],
    init_code_hash: [u8; 32],
    deployer: [u8; 20],
    dry_run: Option<Mutex<DryRunState>>,
}

impl EvmAdapter {
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        if config.family != ChainFamily::Evm {
            return Err(ChainError::UnsupportedChain(format!(
                "{} is not an EVM chain",
                config.chain_id
            )));
        }
        let factory = address::parse_address(&config.factory_address)?;
        let init_code_hash = config
            .init_code_hash
            .as_deref()
            .ok_or_else(|| {
                ChainError::InvalidAddress(format!(
                    "chain {} is missing init_code_hash",
                    config.chain_id
                ))
            })
            .and_then(address::parse_word)?;
        let deployer = address::parse_address(&config.deployer)?;
        let client = RpcClient::new(config.rpc_url.clone());
        let dry_run = config.dry_run.then(|| Mutex::new(DryRunState::default()));

        Ok(Self {
            config,
            client,
            factory,
            init_code_hash,
            deployer,
            dry_run,
        })
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.confirmation_poll_ms)
    }

    /// Deterministic tx ref for dry-run deployments
    fn dry_run_tx_ref(&self, owner: &OwnerPublicKey, salt: &Salt) -> TxRef {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(self.config.chain_id.as_str().as_bytes());
        preimage.extend_from_slice(owner.as_bytes());
        preimage.extend_from_slice(salt.as_bytes());
        TxRef::new(format!("0x{}", hex::encode(address::keccak256(&preimage))))
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain_id(&self) -> &ChainId {
        &self.config.chain_id
    }

    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn predicted_address(&self, owner: &OwnerPublicKey, salt: &Salt) -> ChainResult<Address> {
        address::create2_address(&self.factory, &self.init_code_hash, owner, salt)
    }

    async fn is_deployed(&self, addr: &Address) -> ChainResult<bool> {
        if let Some(state) = &self.dry_run {
            return Ok(state.lock().deployed.contains(addr.as_str()));
        }
        let code: String = self
            .client
            .call("eth_getCode", json!([addr.as_str(), "latest"]))
            .await?;
        Ok(code != "0x" && !code.is_empty())
    }

    async fn deploy(
        &self,
        owner: &OwnerPublicKey,
        salt: &Salt,
        gas_policy: &GasPolicy,
    ) -> ChainResult<TxRef> {
        let predicted = self.predicted_address(owner, salt)?;

        if let GasPolicy::Sponsored { max_fee: Some(cap) } = gas_policy {
            let estimated = self.estimate_deployment_cost().await?;
            if estimated > *cap {
                return Err(ChainError::insufficient_funds(format!(
                    "estimated fee {estimated} exceeds sponsorship cap {cap}"
                )));
            }
        }

        if let Some(state) = &self.dry_run {
            let tx_ref = self.dry_run_tx_ref(owner, salt);
            state
                .lock()
                .in_flight
                .push((tx_ref.clone(), predicted.clone()));
            info!(chain = %self.config.chain_id, address = %predicted, tx = %tx_ref, "dry-run deploy");
            return Ok(tx_ref);
        }

        let calldata = address::deploy_calldata(owner, salt)?;
        let tx = json!([{
            "from": address::to_checksum(&self.deployer),
            "to": address::to_checksum(&self.factory),
            "gas": format!("0x{:x}", self.config.deploy_gas_limit),
            "data": format!("0x{}", hex::encode(calldata)),
        }]);
        let tx_hash: String = self.client.call("eth_sendTransaction", tx).await?;
        info!(
            chain = %self.config.chain_id,
            address = %predicted,
            tx = %tx_hash,
            "broadcast wallet deployment"
        );
        Ok(TxRef::new(tx_hash))
    }

    async fn wait_for_confirmation(
        &self,
        tx_ref: &TxRef,
        timeout: Duration,
    ) -> ChainResult<TxOutcome> {
        if let Some(state) = &self.dry_run {
            let mut state = state.lock();
            if let Some(pos) = state.in_flight.iter().position(|(t, _)| t == tx_ref) {
                let (_, addr) = state.in_flight.remove(pos);
                state.deployed.insert(addr.0);
                return Ok(TxOutcome::confirmed(BlockRef {
                    height: 1,
                    hash: format!("dryrun:{}", self.config.chain_id),
                }));
            }
            return Err(ChainError::protocol(format!("unknown dry-run tx {tx_ref}")));
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let receipt: Option<TxReceipt> = self
                .client
                .call("eth_getTransactionReceipt", json!([tx_ref.as_str()]))
                .await?;

            if let Some(receipt) = receipt {
                let block = match (&receipt.block_number, &receipt.block_hash) {
                    (Some(number), Some(hash)) => Some(BlockRef {
                        height: parse_quantity(number)? as u64,
                        hash: hash.clone(),
                    }),
                    _ => None,
                };
                return match receipt.status.as_deref() {
                    Some("0x1") => {
                        let block = block.ok_or_else(|| {
                            ChainError::protocol("confirmed receipt without block")
                        })?;
                        debug!(chain = %self.config.chain_id, tx = %tx_ref, block = %block, "confirmed");
                        Ok(TxOutcome::confirmed(block))
                    }
                    Some("0x0") => Ok(TxOutcome::reverted(block, "transaction reverted")),
                    other => Err(ChainError::protocol(format!(
                        "unexpected receipt status {other:?}"
                    ))),
                };
            }

            if tokio::time::Instant::now() + self.poll_interval() > deadline {
                return Err(ChainError::timeout(format!(
                    "{tx_ref} unconfirmed after {}s",
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    async fn estimate_deployment_cost(&self) -> ChainResult<Amount> {
        if self.dry_run.is_some() {
            return Ok(Amount::new(21_000u128 * 1_000_000_000));
        }
        let gas_price: String = self.client.call("eth_gasPrice", json!([])).await?;
        let price = parse_quantity(&gas_price)?;
        Ok(Amount::new(price * self.config.deploy_gas_limit as u128))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_crypto::{KeyDeriver, MasterKey};
    use nexus_types::IdentityKey;

    fn dry_config(chain: &str) -> ChainConfig {
        ChainConfig {
            chain_id: ChainId::new(chain),
            family: ChainFamily::Evm,
            rpc_url: "http://localhost:0".to_string(),
            factory_address: "0x00000000000000000000000000000000000000f1".to_string(),
            init_code_hash: Some(format!("0x{}", hex::encode([1u8; 32]))),
            deployer: "0x00000000000000000000000000000000000000d0".to_string(),
            native_currency: "ETH".to_string(),
            deploy_gas_limit: 400_000,
            confirmation_poll_ms: 10,
            dry_run: true,
        }
    }

    fn owner_and_salt() -> (OwnerPublicKey, Salt) {
        let deriver = KeyDeriver::new(MasterKey::new(1, vec![5u8; 32]).unwrap());
        let key = IdentityKey::new("email:alice@example.com");
        let owner = deriver
            .derive_owner_key(&key, ChainFamily::Evm)
            .unwrap()
            .public_key()
            .clone();
        (owner, deriver.derive_salt(&key).unwrap())
    }

    #[test]
    fn family_address_is_chain_invariant() {
        let (owner, salt) = owner_and_salt();
        let ethereum = EvmAdapter::new(dry_config("ethereum")).unwrap();
        let arbitrum = EvmAdapter::new(dry_config("arbitrum")).unwrap();
        assert_eq!(
            ethereum.predicted_address(&owner, &salt).unwrap(),
            arbitrum.predicted_address(&owner, &salt).unwrap()
        );
    }

    #[tokio::test]
    async fn dry_run_deploy_confirms_and_lands() {
        let (owner, salt) = owner_and_salt();
        let adapter = EvmAdapter::new(dry_config("ethereum")).unwrap();
        let predicted = adapter.predicted_address(&owner, &salt).unwrap();

        assert!(!adapter.is_deployed(&predicted).await.unwrap());
        let tx = adapter
            .deploy(&owner, &salt, &GasPolicy::default())
            .await
            .unwrap();
        let outcome = adapter
            .wait_for_confirmation(&tx, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(adapter.is_deployed(&predicted).await.unwrap());
    }

    #[tokio::test]
    async fn dry_run_tx_refs_are_deterministic() {
        let (owner, salt) = owner_and_salt();
        let adapter = EvmAdapter::new(dry_config("ethereum")).unwrap();
        let a = adapter
            .deploy(&owner, &salt, &GasPolicy::default())
            .await
            .unwrap();
        let b = adapter
            .deploy(&owner, &salt, &GasPolicy::default())
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_misconfigured_chains() {
        let mut config = dry_config("ethereum");
        config.init_code_hash = None;
        assert!(EvmAdapter::new(config).is_err());

        let mut config = dry_config("ethereum");
        config.family = ChainFamily::Svm;
        assert!(EvmAdapter::new(config).is_err());
    }
}
