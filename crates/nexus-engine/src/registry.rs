// Wallet registry
//
// Authoritative mapping from identity to per-family wallet records. The
// registry derives keys and predicts addresses on first sight of an
// identity; the orchestrator is the only caller of the status mutator.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use nexus_chain::ChainAdapterRegistry;
use nexus_crypto::KeyDeriver;
use nexus_store::WalletStore;
use nexus_types::{
    ChainFamily, ChainId, DeploymentStatus, IdentityKey, TxRef, WalletRecord,
};

use crate::error::EngineResult;

pub struct WalletRegistry {
    deriver: KeyDeriver,
    chains: Arc<ChainAdapterRegistry>,
    store: Arc<dyn WalletStore>,
}

impl WalletRegistry {
    pub fn new(
        deriver: KeyDeriver,
        chains: Arc<ChainAdapterRegistry>,
        store: Arc<dyn WalletStore>,
    ) -> Self {
        Self {
            deriver,
            chains,
            store,
        }
    }

    /// Look up the record for `(identity, family)`, creating it on first
    /// request.
    ///
    /// Creation derives the owner key and salt, predicts the family-shared
    /// address through any adapter of the family, and persists the record.
    /// Concurrent calls race on the store's compare-and-swap insert and all
    /// observe the same winning record. The predicted address is available
    /// from the returned record immediately, before any deployment.
    pub async fn get_or_create(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
    ) -> EngineResult<WalletRecord> {
        if let Some(existing) = self.store.get_wallet(identity, family).await? {
            return Ok(existing);
        }

        let owner = self.deriver.derive_owner_key(identity, family)?;
        let salt = self.deriver.derive_salt(identity)?;
        let adapter = self.chains.family_adapter(family)?;
        let predicted = adapter.predicted_address(owner.public_key(), &salt)?;

        let now = Utc::now();
        let record = WalletRecord {
            identity_key: identity.clone(),
            chain_family: family,
            owner_public_key: owner.public_key().clone(),
            owner_key_ref: owner.key_ref().to_string(),
            deployment_salt: salt,
            predicted_address: predicted,
            per_chain: HashMap::new(),
            created_at: now,
            updated_at: now,
        };

        let (stored, created) = self.store.insert_if_absent(record).await?;
        if created {
            info!(
                identity = %identity,
                family = %family,
                address = %stored.predicted_address,
                "provisioned wallet record"
            );
        }
        Ok(stored)
    }

    /// Guarded per-chain status mutation; illegal transitions are rejected
    /// by the store
    pub async fn update_deployment_status(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
        chain: &ChainId,
        status: DeploymentStatus,
        tx_ref: Option<TxRef>,
    ) -> EngineResult<WalletRecord> {
        Ok(self
            .store
            .transition_deployment(identity, family, chain, status, tx_ref)
            .await?)
    }

    pub async fn get(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
    ) -> EngineResult<Option<WalletRecord>> {
        Ok(self.store.get_wallet(identity, family).await?)
    }

    pub fn chains(&self) -> &Arc<ChainAdapterRegistry> {
        &self.chains
    }
}
