// Gas tank ledger service

use std::sync::Arc;

use tracing::{info, warn};

use nexus_error::LedgerError;
use nexus_store::LedgerStore;
use nexus_types::{Amount, ChainId, CompanyId, GasTankAccount, LedgerEntry, TxRef};

use crate::error::EngineResult;

/// Result of a sponsorship authorization attempt.
///
/// An insufficient balance is a business decline, not a fault: the caller
/// falls back to user-paid gas or rejects the action, so it is reported in
/// the result rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub authorized: bool,
    pub remaining_balance: Amount,
}

/// Per-company, per-chain prepaid fee sponsorship over the ledger store
pub struct GasTank {
    store: Arc<dyn LedgerStore>,
}

impl GasTank {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Credit a company's tank for one chain; the account is created on
    /// first funding
    pub async fn fund(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        source_ref: Option<TxRef>,
    ) -> EngineResult<GasTankAccount> {
        let account = self.store.fund(company, chain, amount, source_ref).await?;
        info!(
            company = %company,
            chain = %chain,
            amount = %amount,
            balance = %account.balance,
            "gas tank funded"
        );
        Ok(account)
    }

    /// Atomically authorize sponsoring `amount` and debit it.
    ///
    /// The balance check and the debit are one operation in the store, so
    /// concurrent authorizations can never overspend a tank.
    pub async fn authorize_and_debit(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        related_tx: Option<TxRef>,
    ) -> EngineResult<Authorization> {
        match self
            .store
            .debit_if_sufficient(company, chain, amount, related_tx)
            .await
        {
            Ok(account) => Ok(Authorization {
                authorized: true,
                remaining_balance: account.balance,
            }),
            Err(LedgerError::InsufficientBalance {
                requested,
                available,
            }) => {
                warn!(
                    company = %company,
                    chain = %chain,
                    requested,
                    available,
                    "sponsorship declined"
                );
                Ok(Authorization {
                    authorized: false,
                    remaining_balance: Amount::new(available),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Return a debited sponsorship to the tank.
    ///
    /// Used when the sponsored action never happened (broadcast failed,
    /// deployment exhausted); the compensating entry keeps the ledger
    /// reconcilable against the totals.
    pub async fn refund(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        amount: Amount,
        related_tx: Option<TxRef>,
    ) -> EngineResult<GasTankAccount> {
        let account = self.store.fund(company, chain, amount, related_tx).await?;
        info!(
            company = %company,
            chain = %chain,
            amount = %amount,
            balance = %account.balance,
            "sponsorship refunded"
        );
        Ok(account)
    }

    pub async fn account(
        &self,
        company: &CompanyId,
        chain: &ChainId,
    ) -> EngineResult<Option<GasTankAccount>> {
        Ok(self.store.get_account(company, chain).await?)
    }

    /// Deactivated tanks keep their balance but decline authorization
    pub async fn set_active(
        &self,
        company: &CompanyId,
        chain: &ChainId,
        active: bool,
    ) -> EngineResult<GasTankAccount> {
        let account = self.store.set_active(company, chain, active).await?;
        info!(company = %company, chain = %chain, active, "gas tank activation changed");
        Ok(account)
    }

    pub async fn entries(
        &self,
        company: &CompanyId,
        chain: &ChainId,
    ) -> EngineResult<Vec<LedgerEntry>> {
        Ok(self.store.entries(company, chain).await?)
    }
}
