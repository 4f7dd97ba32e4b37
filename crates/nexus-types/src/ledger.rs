// Gas tank accounts and the append-only fee ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Amount, ChainId, CompanyId, TxRef};

/// Prepaid per-company, per-chain balance used to sponsor user fees.
///
/// `balance == total_funded - total_spent` holds at all times and the
/// balance never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasTankAccount {
    pub company_id: CompanyId,
    pub chain: ChainId,
    pub balance: Amount,
    pub total_funded: Amount,
    pub total_spent: Amount,
    /// Deactivated accounts decline authorization but keep their balance
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GasTankAccount {
    pub fn new(company_id: CompanyId, chain: ChainId) -> Self {
        let now = Utc::now();
        Self {
            company_id,
            chain,
            balance: Amount::ZERO,
            total_funded: Amount::ZERO,
            total_spent: Amount::ZERO,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Kind of ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    Fund,
    Debit,
}

impl fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEntryKind::Fund => write!(f, "fund"),
            LedgerEntryKind::Debit => write!(f, "debit"),
        }
    }
}

/// One append-only ledger line referencing a gas tank account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub chain: ChainId,
    pub kind: LedgerEntryKind,
    pub amount: Amount,
    /// Funding source or sponsored transaction this entry relates to
    pub related_tx: Option<TxRef>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        company_id: CompanyId,
        chain: ChainId,
        kind: LedgerEntryKind,
        amount: Amount,
        related_tx: Option<TxRef>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            chain,
            kind,
            amount,
            related_tx,
            created_at: Utc::now(),
        }
    }
}
