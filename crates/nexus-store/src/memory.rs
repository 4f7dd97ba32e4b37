// In-memory store
//
// Backs every storage trait with parking_lot-guarded maps. This is the
// authoritative store for the engine; persistence is a backend concern
// behind the same traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use nexus_error::{
    CorrelatorError, CorrelatorResult, LedgerError, LedgerResult, RegistryError, RegistryResult,
};
use nexus_types::{
    Amount, ChainFamily, ChainId, CompanyId, CorrelatedOperation, DeploymentStatus, GasTankAccount,
    IdentityKey, LedgerEntry, LedgerEntryKind, OperationId, OperationStatus, TxRef, WalletRecord,
};

use crate::traits::{
    LeaseStore, LeaseToken, LedgerStore, OperationStore, OperationUpdate, WalletStore,
};

type WalletKey = (IdentityKey, ChainFamily);
type TankKey = (CompanyId, ChainId);

/// Single-process store implementing every storage trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    wallets: RwLock<HashMap<WalletKey, WalletRecord>>,
    tanks: RwLock<HashMap<TankKey, GasTankAccount>>,
    ledger: RwLock<Vec<LedgerEntry>>,
    operations: RwLock<HashMap<OperationId, CorrelatedOperation>>,
    /// Lease name to holder token and expiry instant
    leases: Mutex<HashMap<String, (LeaseToken, Instant)>>,
    lease_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn insert_if_absent(&self, record: WalletRecord) -> RegistryResult<(WalletRecord, bool)> {
        let key = (record.identity_key.clone(), record.chain_family);
        let mut wallets = self.wallets.write();
        if let Some(existing) = wallets.get(&key) {
            return Ok((existing.clone(), false));
        }
        trace!(identity = %record.identity_key, family = %record.chain_family, "wallet record created");
        wallets.insert(key, record.clone());
        Ok((record, true))
    }

    async fn get_wallet(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
    ) -> RegistryResult<Option<WalletRecord>> {
        let key = (identity.clone(), family);
        Ok(self.wallets.read().get(&key).cloned())
    }

    async fn list_wallets(&self, identity: &IdentityKey) -> RegistryResult<Vec<WalletRecord>> {
        Ok(self
            .wallets
            .read()
            .values()
            .filter(|record| &record.identity_key == identity)
            .cloned()
            .collect())
    }

    async fn transition_deployment(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
        chain: &ChainId,
        next: DeploymentStatus,
        tx_ref: Option<TxRef>,
    ) -> RegistryResult<WalletRecord> {
        let key = (identity.clone(), family);
        let mut wallets = self.wallets.write();
        let record = wallets
            .get_mut(&key)
            .ok_or_else(|| RegistryError::wallet_not_found(identity.as_str()))?;

        let deployment = record.per_chain.entry(chain.clone()).or_default();
        if !deployment.status.can_transition_to(next) {
            return Err(RegistryError::illegal_transition(
                deployment.status.to_string(),
                next.to_string(),
            ));
        }

        if next == DeploymentStatus::Pending {
            deployment.attempts += 1;
        }
        deployment.status = next;
        if tx_ref.is_some() {
            deployment.tx_ref = tx_ref;
        }
        let now = Utc::now();
        deployment.updated_at = now;
        record.updated_at = now;
        Ok(record.clone())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn fund(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        related_tx: Option<TxRef>,
    ) -> LedgerResult<GasTankAccount> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount("fund amount is zero".into()));
        }
        let key = (company.clone(), chain.clone());
        let mut tanks = self.tanks.write();
        let account = tanks
            .entry(key)
            .or_insert_with(|| GasTankAccount::new(company.clone(), chain.clone()));

        // funding is not authorization; inactive tanks still accept credits
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount("balance overflow".into()))?;
        account.total_funded = account
            .total_funded
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount("funded total overflow".into()))?;
        account.updated_at = Utc::now();

        self.ledger.write().push(LedgerEntry::new(
            company.clone(),
            chain.clone(),
            LedgerEntryKind::Fund,
            amount,
            related_tx,
        ));
        Ok(account.clone())
    }

    async fn debit_if_sufficient(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        related_tx: Option<TxRef>,
    ) -> LedgerResult<GasTankAccount> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount("debit amount is zero".into()));
        }
        let key = (company.clone(), chain.clone());
        let mut tanks = self.tanks.write();
        let account = tanks
            .get_mut(&key)
            .ok_or_else(|| LedgerError::account_not_found(company.to_string()))?;
        if !account.is_active {
            return Err(LedgerError::AccountInactive(company.to_string()));
        }
        let remaining = account.balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::insufficient(amount.0, account.balance.0)
        })?;

        account.balance = remaining;
        account.total_spent = account
            .total_spent
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount("spent total overflow".into()))?;
        account.updated_at = Utc::now();

        self.ledger.write().push(LedgerEntry::new(
            company.clone(),
            chain.clone(),
            LedgerEntryKind::Debit,
            amount,
            related_tx,
        ));
        Ok(account.clone())
    }

    async fn get_account(
        &self,
        company: &CompanyId,
        chain: &ChainId,
    ) -> LedgerResult<Option<GasTankAccount>> {
        let key = (company.clone(), chain.clone());
        Ok(self.tanks.read().get(&key).cloned())
    }

    async fn set_active(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        active: bool,
    ) -> LedgerResult<GasTankAccount> {
        let key = (company.clone(), chain.clone());
        let mut tanks = self.tanks.write();
        let account = tanks
            .get_mut(&key)
            .ok_or_else(|| LedgerError::account_not_found(company.to_string()))?;
        account.is_active = active;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn entries(&self, company: &CompanyId, chain: &ChainId) -> LedgerResult<Vec<LedgerEntry>> {
        Ok(self
            .ledger
            .read()
            .iter()
            .filter(|entry| &entry.company_id == company && &entry.chain == chain)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OperationStore for MemoryStore {
    async fn insert_operation(&self, op: CorrelatedOperation) -> CorrelatorResult<()> {
        self.operations.write().insert(op.operation_id, op);
        Ok(())
    }

    async fn get_operation(
        &self,
        id: &OperationId,
    ) -> CorrelatorResult<Option<CorrelatedOperation>> {
        Ok(self.operations.read().get(id).cloned())
    }

    async fn transition_operation(
        &self,
        id: &OperationId,
        next: OperationStatus,
        update: OperationUpdate,
    ) -> CorrelatorResult<CorrelatedOperation> {
        let mut operations = self.operations.write();
        let op = operations
            .get_mut(id)
            .ok_or_else(|| CorrelatorError::not_found(id.to_string()))?;
        if !op.status.can_transition_to(next) {
            return Err(CorrelatorError::illegal_transition(
                op.status.to_string(),
                next.to_string(),
            ));
        }
        if let Some(dest_chain) = update.dest_chain {
            op.dest_chain = Some(dest_chain);
        }
        if let Some(dest_tx) = update.dest_tx {
            op.dest_tx = Some(dest_tx);
        }
        op.status = next;
        op.updated_at = Utc::now();
        Ok(op.clone())
    }

    async fn stale_operations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> CorrelatorResult<Vec<CorrelatedOperation>> {
        Ok(self
            .operations
            .read()
            .values()
            .filter(|op| !op.status.is_terminal() && op.status != OperationStatus::Stalled)
            .filter(|op| op.updated_at < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn acquire_lease(&self, key: &str, ttl: Duration) -> RegistryResult<LeaseToken> {
        let mut leases = self.leases.lock();
        let now = Instant::now();
        if let Some((_, expiry)) = leases.get(key) {
            if *expiry > now {
                return Err(RegistryError::LeaseHeld(key.to_string()));
            }
        }
        let token = LeaseToken(self.lease_seq.fetch_add(1, Ordering::Relaxed));
        leases.insert(key.to_string(), (token, now + ttl));
        Ok(token)
    }

    async fn release_lease(&self, key: &str, token: LeaseToken) {
        let mut leases = self.leases.lock();
        if leases.get(key).map(|(held, _)| *held) == Some(token) {
            leases.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(identity: &str, family: ChainFamily) -> WalletRecord {
        let now = Utc::now();
        WalletRecord {
            identity_key: IdentityKey::new(identity),
            chain_family: family,
            owner_public_key: nexus_types::OwnerPublicKey(vec![2u8; 33]),
            owner_key_ref: "hmac:v1".to_string(),
            deployment_salt: nexus_types::Salt([7u8; 32]),
            predicted_address: nexus_types::Address::new("0xabc"),
            per_chain: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn first_insert_wins() {
        let store = MemoryStore::new();
        let a = record("email:alice@example.com", ChainFamily::Evm);
        let mut b = a.clone();
        b.owner_key_ref = "hmac:v2".to_string();

        let (stored, created) = store.insert_if_absent(a.clone()).await.unwrap();
        assert!(created);
        assert_eq!(stored.owner_key_ref, "hmac:v1");

        let (stored, created) = store.insert_if_absent(b).await.unwrap();
        assert!(!created);
        assert_eq!(stored.owner_key_ref, "hmac:v1");
    }

    #[tokio::test]
    async fn concurrent_inserts_agree() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for n in 0..16u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut rec = record("email:bob@example.com", ChainFamily::Evm);
                rec.owner_key_ref = format!("hmac:v{n}");
                store.insert_if_absent(rec).await.unwrap().0.owner_key_ref
            }));
        }
        let mut refs = Vec::new();
        for handle in handles {
            refs.push(handle.await.unwrap());
        }
        refs.dedup();
        assert_eq!(refs.len(), 1);
    }

    #[tokio::test]
    async fn deployment_transitions_are_guarded() {
        let store = MemoryStore::new();
        let rec = record("email:alice@example.com", ChainFamily::Evm);
        let identity = rec.identity_key.clone();
        store.insert_if_absent(rec).await.unwrap();
        let chain = ChainId::new("ethereum");

        // NotDeployed -> Deployed skips Pending
        let err = store
            .transition_deployment(
                &identity,
                ChainFamily::Evm,
                &chain,
                DeploymentStatus::Deployed,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::IllegalStateTransition { .. }));

        let rec = store
            .transition_deployment(
                &identity,
                ChainFamily::Evm,
                &chain,
                DeploymentStatus::Pending,
                Some(TxRef::new("0x01")),
            )
            .await
            .unwrap();
        assert_eq!(rec.deployment(&chain).attempts, 1);

        let rec = store
            .transition_deployment(
                &identity,
                ChainFamily::Evm,
                &chain,
                DeploymentStatus::Deployed,
                None,
            )
            .await
            .unwrap();
        assert_eq!(rec.status(&chain), DeploymentStatus::Deployed);
        // tx ref survives the confirmation transition
        assert_eq!(rec.deployment(&chain).tx_ref, Some(TxRef::new("0x01")));
    }

    #[tokio::test]
    async fn retry_counts_attempts() {
        let store = MemoryStore::new();
        let rec = record("email:alice@example.com", ChainFamily::Evm);
        let identity = rec.identity_key.clone();
        store.insert_if_absent(rec).await.unwrap();
        let chain = ChainId::new("ethereum");

        for _ in 0..3 {
            store
                .transition_deployment(
                    &identity,
                    ChainFamily::Evm,
                    &chain,
                    DeploymentStatus::Pending,
                    None,
                )
                .await
                .unwrap();
            store
                .transition_deployment(
                    &identity,
                    ChainFamily::Evm,
                    &chain,
                    DeploymentStatus::Failed,
                    None,
                )
                .await
                .unwrap();
        }
        let rec = store
            .get_wallet(&identity, ChainFamily::Evm)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rec.deployment(&chain).attempts, 3);
    }

    #[tokio::test]
    async fn concurrent_debits_never_overspend() {
        let store = Arc::new(MemoryStore::new());
        let company = CompanyId::new("acme");
        let chain = ChainId::new("ethereum");
        store
            .fund(&company, &chain, Amount::new(10), None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = store.clone();
            let company = company.clone();
            let chain = chain.clone();
            handles.push(tokio::spawn(async move {
                store
                    .debit_if_sufficient(&company, &chain, Amount::new(6), None)
                    .await
            }));
        }
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        // exactly one of the two 6-unit debits against a 10-unit tank lands
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let account = store.get_account(&company, &chain).await.unwrap().unwrap();
        assert_eq!(account.balance, Amount::new(4));
        assert_eq!(account.total_spent, Amount::new(6));
    }

    #[tokio::test]
    async fn inactive_tank_declines_but_keeps_balance() {
        let store = MemoryStore::new();
        let company = CompanyId::new("acme");
        let chain = ChainId::new("ethereum");
        store
            .fund(&company, &chain, Amount::new(100), None)
            .await
            .unwrap();
        store.set_active(&company, &chain, false).await.unwrap();

        let err = store
            .debit_if_sufficient(&company, &chain, Amount::new(1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountInactive(_)));
        let account = store.get_account(&company, &chain).await.unwrap().unwrap();
        assert_eq!(account.balance, Amount::new(100));
    }

    #[tokio::test]
    async fn ledger_lines_reconcile_with_totals() {
        let store = MemoryStore::new();
        let company = CompanyId::new("acme");
        let chain = ChainId::new("ethereum");
        store
            .fund(&company, &chain, Amount::new(50), None)
            .await
            .unwrap();
        store
            .debit_if_sufficient(&company, &chain, Amount::new(20), Some(TxRef::new("0xaa")))
            .await
            .unwrap();

        let entries = store.entries(&company, &chain).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, LedgerEntryKind::Fund);
        assert_eq!(entries[1].kind, LedgerEntryKind::Debit);
        assert_eq!(entries[1].related_tx, Some(TxRef::new("0xaa")));

        let account = store.get_account(&company, &chain).await.unwrap().unwrap();
        assert_eq!(
            account.total_funded.checked_sub(account.total_spent),
            Some(account.balance)
        );
    }

    #[tokio::test]
    async fn operation_transitions_are_guarded() {
        let store = MemoryStore::new();
        let op = CorrelatedOperation::new(ChainId::new("ethereum"), TxRef::new("0x01"));
        let id = op.operation_id;
        store.insert_operation(op).await.unwrap();

        let err = store
            .transition_operation(
                &id,
                OperationStatus::DestinationLinked,
                OperationUpdate::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CorrelatorError::IllegalTransition { .. }));

        store
            .transition_operation(
                &id,
                OperationStatus::SourceConfirmed,
                OperationUpdate::default(),
            )
            .await
            .unwrap();
        let op = store
            .transition_operation(
                &id,
                OperationStatus::DestinationLinked,
                OperationUpdate {
                    dest_chain: Some(ChainId::new("solana")),
                    dest_tx: Some(TxRef::new("sig")),
                },
            )
            .await
            .unwrap();
        assert_eq!(op.dest_chain, Some(ChainId::new("solana")));
        assert_eq!(op.dest_tx, Some(TxRef::new("sig")));
    }

    #[tokio::test]
    async fn stale_sweep_skips_terminal_and_stalled() {
        let store = MemoryStore::new();
        let mut fresh = CorrelatedOperation::new(ChainId::new("ethereum"), TxRef::new("0x01"));
        fresh.updated_at = Utc::now() - chrono::Duration::hours(2);
        let stale_id = fresh.operation_id;
        store.insert_operation(fresh).await.unwrap();

        let mut done = CorrelatedOperation::new(ChainId::new("ethereum"), TxRef::new("0x02"));
        done.status = OperationStatus::Completed;
        done.updated_at = Utc::now() - chrono::Duration::hours(2);
        store.insert_operation(done).await.unwrap();

        let stale = store
            .stale_operations(Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].operation_id, stale_id);
    }

    #[tokio::test]
    async fn lease_excludes_second_holder_until_release() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(30);
        let token = store.acquire_lease("deploy:ethereum:k", ttl).await.unwrap();
        let err = store
            .acquire_lease("deploy:ethereum:k", ttl)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::LeaseHeld(_)));

        store.release_lease("deploy:ethereum:k", token).await;
        store.acquire_lease("deploy:ethereum:k", ttl).await.unwrap();
    }

    #[tokio::test]
    async fn stale_holder_cannot_release_a_reacquired_lease() {
        let store = MemoryStore::new();
        let stale = store
            .acquire_lease("deploy:ethereum:k", Duration::from_millis(0))
            .await
            .unwrap();
        let live = store
            .acquire_lease("deploy:ethereum:k", Duration::from_secs(30))
            .await
            .unwrap();
        assert_ne!(stale, live);

        // the expired holder's token is dead weight
        store.release_lease("deploy:ethereum:k", stale).await;
        let err = store
            .acquire_lease("deploy:ethereum:k", Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::LeaseHeld(_)));

        store.release_lease("deploy:ethereum:k", live).await;
        store
            .acquire_lease("deploy:ethereum:k", Duration::from_secs(30))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_lease_is_reacquirable() {
        let store = MemoryStore::new();
        store
            .acquire_lease("deploy:solana:k", Duration::from_millis(0))
            .await
            .unwrap();
        store
            .acquire_lease("deploy:solana:k", Duration::from_secs(30))
            .await
            .unwrap();
    }
}
