// Storage traits
//
// The engine only ever talks to these traits; the in-memory implementation
// in this crate is the authoritative store for tests and single-process
// deployments, and a persistent backend can be slotted in behind the same
// interface.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use nexus_error::{CorrelatorResult, LedgerResult, RegistryResult};
use nexus_types::{
    Amount, ChainFamily, ChainId, CompanyId, CorrelatedOperation, DeploymentStatus, GasTankAccount,
    IdentityKey, LedgerEntry, OperationId, OperationStatus, TxRef, WalletRecord,
};

/// Wallet record storage keyed by `(identity, chain family)`.
///
/// All mutations are atomic with respect to one key: two concurrent
/// `insert_if_absent` calls for the same identity always agree on the
/// stored record.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Store `record` unless a record for its key already exists. Returns
    /// the stored record and whether this call created it; the existing
    /// record always wins.
    async fn insert_if_absent(&self, record: WalletRecord) -> RegistryResult<(WalletRecord, bool)>;

    async fn get_wallet(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
    ) -> RegistryResult<Option<WalletRecord>>;

    /// All family records for an identity
    async fn list_wallets(&self, identity: &IdentityKey) -> RegistryResult<Vec<WalletRecord>>;

    /// Move a chain's deployment state to `next`, recording `tx_ref` when
    /// given. Rejects moves `DeploymentStatus::can_transition_to` forbids;
    /// entering `Pending` counts one deployment attempt.
    async fn transition_deployment(
        &self,
        identity: &IdentityKey,
        family: ChainFamily,
        chain: &ChainId,
        next: DeploymentStatus,
        tx_ref: Option<TxRef>,
    ) -> RegistryResult<WalletRecord>;
}

/// Gas tank accounts plus their append-only entry log.
///
/// `debit_if_sufficient` is the single authorization primitive: the balance
/// check and the debit happen under one lock so concurrent debits can never
/// overspend a tank.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Credit a tank, creating the account on first funding
    async fn fund(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        related_tx: Option<TxRef>,
    ) -> LedgerResult<GasTankAccount>;

    /// Atomically debit `amount` when the tank is active and covers it
    async fn debit_if_sufficient(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        related_tx: Option<TxRef>,
    ) -> LedgerResult<GasTankAccount>;

    async fn get_account(
        &self,
        company: &CompanyId,
        chain: &ChainId,
    ) -> LedgerResult<Option<GasTankAccount>>;

    /// Activate or deactivate a tank; the balance is untouched
    async fn set_active(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        active: bool,
    ) -> LedgerResult<GasTankAccount>;

    /// Ledger lines for one tank, oldest first
    async fn entries(&self, company: &CompanyId, chain: &ChainId) -> LedgerResult<Vec<LedgerEntry>>;
}

/// Field updates applied together with an operation status transition
#[derive(Debug, Clone, Default)]
pub struct OperationUpdate {
    pub dest_chain: Option<ChainId>,
    pub dest_tx: Option<TxRef>,
}

/// Correlated operation storage
#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn insert_operation(&self, op: CorrelatedOperation) -> CorrelatorResult<()>;

    async fn get_operation(
        &self,
        id: &OperationId,
    ) -> CorrelatorResult<Option<CorrelatedOperation>>;

    /// Move an operation to `next`, applying `update` in the same step.
    /// Rejects moves `OperationStatus::can_transition_to` forbids.
    async fn transition_operation(
        &self,
        id: &OperationId,
        next: OperationStatus,
        update: OperationUpdate,
    ) -> CorrelatorResult<CorrelatedOperation>;

    /// Non-terminal operations last touched before `cutoff`; the stall
    /// sweep feeds on this
    async fn stale_operations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> CorrelatorResult<Vec<CorrelatedOperation>>;
}

/// Proof of lease ownership, handed out by `acquire_lease` and required to
/// release. A holder whose lease expired and was taken over cannot release
/// the successor's lease with a stale token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseToken(pub u64);

/// Deployment leases.
///
/// A lease serializes workers racing to deploy the same wallet on the same
/// chain. Leases expire on their own so a crashed holder never wedges a
/// deployment forever.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Take the lease named `key` for `ttl`. Fails with
    /// `RegistryError::LeaseHeld` while another holder's lease is live.
    async fn acquire_lease(&self, key: &str, ttl: Duration) -> RegistryResult<LeaseToken>;

    /// Give the lease back early. A no-op unless `token` still holds the
    /// lease.
    async fn release_lease(&self, key: &str, token: LeaseToken);
}
