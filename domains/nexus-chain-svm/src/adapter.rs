// SVM chain adapter

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use nexus_chain::{ChainAdapter, ChainConfig, GasPolicy, TxOutcome};
use nexus_error::{ChainError, ChainResult};
use nexus_types::{Address, Amount, BlockRef, ChainFamily, ChainId, OwnerPublicKey, Salt, TxRef};

use crate::pda::{find_program_address, Pubkey};
use crate::rpc::{RpcClient, WithContext};
use crate::tx;

/// Seed prefix shared with the on-chain wallet program
const WALLET_SEED: &[u8] = b"wallet";

/// Size of an initialized wallet account: discriminator, owner, salt, bump
const WALLET_ACCOUNT_LEN: u64 = 8 + 32 + 32 + 1;

/// Base fee per signature, in lamports
const SIGNATURE_FEE: u128 = 5_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    slot: u64,
    err: Option<Value>,
    confirmation_status: Option<String>,
}

/// State for dry-run adapters: which predicted addresses have "deployed"
#[derive(Debug, Default)]
struct DryRunState {
    deployed: HashSet<String>,
    in_flight: Vec<(TxRef, Address)>,
}

/// Chain adapter for SVM-family chains.
///
/// The wallet program id plays the role the factory contract plays on EVM
/// chains: predicted addresses are program-derived addresses under it, so
/// every chain configured with the same program shares one address.
#[derive(Debug)]
pub struct SvmAdapter {
    config: ChainConfig,
    client: RpcClient,
    program_id: Pubkey,
    fee_payer: ed25519_dalek::SigningKey,
    dry_run: Option<Mutex<DryRunState>>,
}

impl SvmAdapter {
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        if config.family != ChainFamily::Svm {
            return Err(ChainError::UnsupportedChain(format!(
                "{} is not an SVM chain",
                config.chain_id
            )));
        }
        let program_id = Pubkey::parse(&config.factory_address)?;
        let seed_bytes = hex::decode(&config.deployer).map_err(|e| {
            ChainError::InvalidAddress(format!(
                "chain {}: fee payer seed is not hex: {e}",
                config.chain_id
            ))
        })?;
        let seed: [u8; 32] = seed_bytes.as_slice().try_into().map_err(|_| {
            ChainError::InvalidAddress(format!(
                "chain {}: fee payer seed must be 32 bytes",
                config.chain_id
            ))
        })?;
        let fee_payer = ed25519_dalek::SigningKey::from_bytes(&seed);
        let client = RpcClient::new(config.rpc_url.clone());
        let dry_run = config.dry_run.then(|| Mutex::new(DryRunState::default()));

        Ok(Self {
            config,
            client,
            program_id,
            fee_payer,
            dry_run,
        })
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.confirmation_poll_ms)
    }

    fn owner_bytes(owner: &OwnerPublicKey) -> ChainResult<[u8; 32]> {
        owner.as_bytes().try_into().map_err(|_| {
            ChainError::InvalidAddress(format!(
                "owner key must be 32 bytes for SVM, got {}",
                owner.as_bytes().len()
            ))
        })
    }

    /// Deterministic tx ref for dry-run deployments
    fn dry_run_tx_ref(&self, owner: &OwnerPublicKey, salt: &Salt) -> TxRef {
        let mut hasher = Sha256::new();
        hasher.update(self.config.chain_id.as_str().as_bytes());
        hasher.update(owner.as_bytes());
        hasher.update(salt.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        TxRef::new(bs58::encode(digest).into_string())
    }
}

#[async_trait]
impl ChainAdapter for SvmAdapter {
    fn chain_id(&self) -> &ChainId {
        &self.config.chain_id
    }

    fn family(&self) -> ChainFamily {
        ChainFamily::Svm
    }

    fn predicted_address(&self, owner: &OwnerPublicKey, salt: &Salt) -> ChainResult<Address> {
        let owner = Self::owner_bytes(owner)?;
        let (pda, _bump) = find_program_address(
            &[WALLET_SEED, &owner, salt.as_bytes()],
            &self.program_id,
        )?;
        Ok(Address::new(pda.to_string()))
    }

    async fn is_deployed(&self, addr: &Address) -> ChainResult<bool> {
        if let Some(state) = &self.dry_run {
            return Ok(state.lock().deployed.contains(addr.as_str()));
        }
        let info: WithContext<Option<Value>> = self
            .client
            .call(
                "getAccountInfo",
                json!([addr.as_str(), {"encoding": "base64"}]),
            )
            .await?;
        Ok(info.value.is_some())
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

        let owner_bytes = Self::owner_bytes(owner)?;
        let pda = Pubkey::parse(predicted.as_str())?;

        let latest: WithContext<LatestBlockhash> =
            self.client.call("getLatestBlockhash", json!([])).await?;
        let blockhash = Pubkey::parse(&latest.value.blockhash)?;

        let data = tx::initialize_wallet_data(&owner_bytes, salt.as_bytes());
        let (wire, signature) = tx::build_initialize_wallet_tx(
            &self.fee_payer,
            &self.program_id,
            &pda,
            &blockhash,
            data,
        )?;

        let accepted: String = self
            .client
            .call("sendTransaction", json!([wire, {"encoding": "base64"}]))
            .await?;
        if accepted != signature {
            return Err(ChainError::protocol(format!(
                "endpoint acknowledged signature {accepted}, expected {signature}"
            )));
        }
        info!(
            chain = %self.config.chain_id,
            address = %predicted,
            tx = %signature,
            "broadcast wallet deployment"
        );
        Ok(TxRef::new(signature))
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
            let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
                .client
                .call(
                    "getSignatureStatuses",
                    json!([[tx_ref.as_str()], {"searchTransactionHistory": true}]),
                )
                .await?;

            if let Some(Some(status)) = statuses.value.into_iter().next() {
                let settled = matches!(
                    status.confirmation_status.as_deref(),
                    Some("confirmed") | Some("finalized")
                );
                if settled {
                    let block = BlockRef {
                        height: status.slot,
                        hash: format!("slot:{}", status.slot),
                    };
                    return if let Some(err) = status.err {
                        Ok(TxOutcome::reverted(Some(block), err.to_string()))
                    } else {
                        debug!(chain = %self.config.chain_id, tx = %tx_ref, block = %block, "confirmed");
                        Ok(TxOutcome::confirmed(block))
                    };
                }
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
            return Ok(Amount::new(SIGNATURE_FEE + 1_000_000));
        }
        let rent: u64 = self
            .client
            .call(
                "getMinimumBalanceForRentExemption",
                json!([WALLET_ACCOUNT_LEN]),
            )
            .await?;
        Ok(Amount::new(rent as u128 + SIGNATURE_FEE))
    }
}
