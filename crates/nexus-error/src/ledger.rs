// Gas tank ledger error types

use thiserror::Error;

use crate::{ErrorCode, ErrorDomain, NexusError, Retryable};

/// Ledger-specific error codes
pub mod codes {
    use crate::ErrorCode;

    // Ledger error codes start with 4000
    pub const INSUFFICIENT_BALANCE: ErrorCode = ErrorCode(4001);
    pub const ACCOUNT_NOT_FOUND: ErrorCode = ErrorCode(4002);
    pub const ACCOUNT_INACTIVE: ErrorCode = ErrorCode(4003);
    pub const INVALID_AMOUNT: ErrorCode = ErrorCode(4004);
}

/// Errors raised by the gas tank ledger
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// Business decline: the caller falls back to user-pays-gas or rejects
    /// the action. The balance is reported in smallest units.
    #[error("insufficient gas tank balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("gas tank account not found: {0}")]
    AccountNotFound(String),

    /// Deactivated accounts keep their balance but decline authorization
    #[error("gas tank account inactive: {0}")]
    AccountInactive(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl LedgerError {
    pub fn insufficient(requested: u128, available: u128) -> Self {
        LedgerError::InsufficientBalance {
            requested,
            available,
        }
    }

    pub fn account_not_found(key: impl Into<String>) -> Self {
        LedgerError::AccountNotFound(key.into())
    }

    pub fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            LedgerError::InsufficientBalance { .. } => INSUFFICIENT_BALANCE,
            LedgerError::AccountNotFound(_) => ACCOUNT_NOT_FOUND,
            LedgerError::AccountInactive(_) => ACCOUNT_INACTIVE,
            LedgerError::InvalidAmount(_) => INVALID_AMOUNT,
        }
    }
}

impl NexusError for LedgerError {
    fn error_code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientBalance { .. } => "LEDGER_INSUFFICIENT_BALANCE",
            LedgerError::AccountNotFound(_) => "LEDGER_ACCOUNT_NOT_FOUND",
            LedgerError::AccountInactive(_) => "LEDGER_ACCOUNT_INACTIVE",
            LedgerError::InvalidAmount(_) => "LEDGER_INVALID_AMOUNT",
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Ledger
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Retryable for LedgerError {
    fn is_retryable(&self) -> bool {
        false
    }
}

impl From<LedgerError> for Box<dyn NexusError> {
    fn from(err: LedgerError) -> Self {
        Box::new(err)
    }
}

/// Convenient Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
