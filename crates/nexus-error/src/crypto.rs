// Key-derivation error types

use thiserror::Error;

use crate::{ErrorCode, ErrorDomain, NexusError, Retryable};

/// Crypto-specific error codes
pub mod codes {
    use crate::ErrorCode;

    // Crypto error codes start with 1000
    pub const INVALID_IDENTITY: ErrorCode = ErrorCode(1001);
    pub const KEY_DERIVATION: ErrorCode = ErrorCode(1002);
    pub const INVALID_MASTER_KEY: ErrorCode = ErrorCode(1003);
}

/// Errors raised by identity key derivation
#[derive(Error, Debug, Clone)]
pub enum CryptoError {
    /// Empty social id or unrecognized social type
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Derivation produced unusable key material
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The configured master key is malformed
    #[error("invalid master key: {0}")]
    InvalidMasterKey(String),
}

impl CryptoError {
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        CryptoError::InvalidIdentity(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            CryptoError::InvalidIdentity(_) => INVALID_IDENTITY,
            CryptoError::KeyDerivation(_) => KEY_DERIVATION,
            CryptoError::InvalidMasterKey(_) => INVALID_MASTER_KEY,
        }
    }
}

impl NexusError for CryptoError {
    fn error_code(&self) -> &'static str {
        match self {
            CryptoError::InvalidIdentity(_) => "CRYPTO_INVALID_IDENTITY",
            CryptoError::KeyDerivation(_) => "CRYPTO_KEY_DERIVATION",
            CryptoError::InvalidMasterKey(_) => "CRYPTO_INVALID_MASTER_KEY",
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Crypto
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Retryable for CryptoError {
    fn is_retryable(&self) -> bool {
        false
    }
}

impl From<CryptoError> for Box<dyn NexusError> {
    fn from(err: CryptoError) -> Self {
        Box::new(err)
    }
}

/// Convenient Result type for derivation operations
pub type CryptoResult<T> = Result<T, CryptoError>;
