// Wallet registry and deployment orchestration error types

use thiserror::Error;

use crate::{ErrorCode, ErrorDomain, NexusError, Retryable};

/// Registry-specific error codes
pub mod codes {
    use crate::ErrorCode;

    // Registry error codes start with 3000
    pub const WALLET_NOT_FOUND: ErrorCode = ErrorCode(3001);
    pub const ILLEGAL_STATE_TRANSITION: ErrorCode = ErrorCode(3002);
    pub const DEPLOYMENT_EXHAUSTED: ErrorCode = ErrorCode(3003);
    pub const CONFIG_ERROR: ErrorCode = ErrorCode(3004);
    pub const LEASE_HELD: ErrorCode = ErrorCode(3005);
}

/// Errors raised by the wallet registry and the deployment orchestrator
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    /// Invariant violation; should never occur in a correct concurrent
    /// implementation. Logged as a bug when it does.
    #[error("illegal state transition: {from} -> {to}")]
    IllegalStateTransition { from: String, to: String },

    /// Permanent after the attempt cap; needs manual intervention
    #[error("deployment exhausted after {attempts} attempts: {detail}")]
    DeploymentExhausted { attempts: u32, detail: String },

    /// Chain registry configuration is inconsistent (e.g. EVM chains in one
    /// family with diverging factory addresses)
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Another worker holds the deployment lease for this identity/chain
    #[error("deployment lease held: {0}")]
    LeaseHeld(String),
}

impl RegistryError {
    pub fn wallet_not_found(key: impl Into<String>) -> Self {
        RegistryError::WalletNotFound(key.into())
    }

    pub fn illegal_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        RegistryError::IllegalStateTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        RegistryError::ConfigError(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            RegistryError::WalletNotFound(_) => WALLET_NOT_FOUND,
            RegistryError::IllegalStateTransition { .. } => ILLEGAL_STATE_TRANSITION,
            RegistryError::DeploymentExhausted { .. } => DEPLOYMENT_EXHAUSTED,
            RegistryError::ConfigError(_) => CONFIG_ERROR,
            RegistryError::LeaseHeld(_) => LEASE_HELD,
        }
    }
}

impl NexusError for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            RegistryError::WalletNotFound(_) => "REGISTRY_WALLET_NOT_FOUND",
            RegistryError::IllegalStateTransition { .. } => "REGISTRY_ILLEGAL_TRANSITION",
            RegistryError::DeploymentExhausted { .. } => "REGISTRY_DEPLOYMENT_EXHAUSTED",
            RegistryError::ConfigError(_) => "REGISTRY_CONFIG_ERROR",
            RegistryError::LeaseHeld(_) => "REGISTRY_LEASE_HELD",
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Registry
    }

    fn is_transient(&self) -> bool {
        // a held lease resolves once the owner finishes or the TTL lapses
        matches!(self, RegistryError::LeaseHeld(_))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Retryable for RegistryError {
    fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::LeaseHeld(_))
    }
}

impl From<RegistryError> for Box<dyn NexusError> {
    fn from(err: RegistryError) -> Self {
        Box::new(err)
    }
}

/// Convenient Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
