// Chain adapter error types
// These errors are the failure taxonomy shared by every chain family adapter

use thiserror::Error;

use crate::{ErrorCode, ErrorDomain, NexusError, Retryable};

/// Chain-specific error codes
pub mod codes {
    use crate::ErrorCode;

    // Chain error codes start with 2000
    pub const RPC_UNAVAILABLE: ErrorCode = ErrorCode(2001);
    pub const INSUFFICIENT_FUNDS: ErrorCode = ErrorCode(2002);
    pub const TRANSACTION_REVERTED: ErrorCode = ErrorCode(2003);
    pub const TIMEOUT: ErrorCode = ErrorCode(2004);
    pub const INVALID_ADDRESS: ErrorCode = ErrorCode(2005);
    pub const PROTOCOL_ERROR: ErrorCode = ErrorCode(2006);
    pub const UNSUPPORTED_CHAIN: ErrorCode = ErrorCode(2007);
}

/// Failure taxonomy for chain RPC operations
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    /// Transient network or RPC endpoint failure; retry with backoff
    #[error("RPC unavailable: {0}")]
    RpcUnavailable(String),

    /// The deployer/funding account lacks balance; needs external funding
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Permanent failure for this salt/owner/nonce; needs investigation
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    /// Outcome ambiguous: the transaction may or may not have landed.
    /// Re-query chain state before retrying.
    #[error("confirmation timed out: {0}")]
    Timeout(String),

    /// Malformed or out-of-family address or key material
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Unexpected wire-level response from the endpoint
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No adapter is registered for the requested chain
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),
}

impl ChainError {
    pub fn rpc_unavailable(message: impl Into<String>) -> Self {
        ChainError::RpcUnavailable(message.into())
    }

    pub fn insufficient_funds(message: impl Into<String>) -> Self {
        ChainError::InsufficientFunds(message.into())
    }

    pub fn reverted(message: impl Into<String>) -> Self {
        ChainError::TransactionReverted(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ChainError::Timeout(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        ChainError::Protocol(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            ChainError::RpcUnavailable(_) => RPC_UNAVAILABLE,
            ChainError::InsufficientFunds(_) => INSUFFICIENT_FUNDS,
            ChainError::TransactionReverted(_) => TRANSACTION_REVERTED,
            ChainError::Timeout(_) => TIMEOUT,
            ChainError::InvalidAddress(_) => INVALID_ADDRESS,
            ChainError::Protocol(_) => PROTOCOL_ERROR,
            ChainError::UnsupportedChain(_) => UNSUPPORTED_CHAIN,
        }
    }
}

impl NexusError for ChainError {
    fn error_code(&self) -> &'static str {
        match self {
            ChainError::RpcUnavailable(_) => "CHAIN_RPC_UNAVAILABLE",
            ChainError::InsufficientFunds(_) => "CHAIN_INSUFFICIENT_FUNDS",
            ChainError::TransactionReverted(_) => "CHAIN_TRANSACTION_REVERTED",
            ChainError::Timeout(_) => "CHAIN_TIMEOUT",
            ChainError::InvalidAddress(_) => "CHAIN_INVALID_ADDRESS",
            ChainError::Protocol(_) => "CHAIN_PROTOCOL_ERROR",
            ChainError::UnsupportedChain(_) => "CHAIN_UNSUPPORTED",
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Chain
    }

    fn is_transient(&self) -> bool {
        self.is_retryable()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Retryable for ChainError {
    fn is_retryable(&self) -> bool {
        matches!(self, ChainError::RpcUnavailable(_))
    }

    fn needs_requery(&self) -> bool {
        matches!(self, ChainError::Timeout(_))
    }
}

impl From<ChainError> for Box<dyn NexusError> {
    fn from(err: ChainError) -> Self {
        Box::new(err)
    }
}

/// Convenient Result type for chain operations
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rpc_unavailable_is_retryable() {
        assert!(ChainError::rpc_unavailable("conn refused").is_retryable());
        assert!(!ChainError::insufficient_funds("0 wei").is_retryable());
        assert!(!ChainError::reverted("out of gas").is_retryable());
        assert!(!ChainError::timeout("30s").is_retryable());
    }

    #[test]
    fn timeout_requires_requery() {
        assert!(ChainError::timeout("30s").needs_requery());
        assert!(!ChainError::rpc_unavailable("x").needs_requery());
    }
}
