// Engine-level error type
//
// The engine composes every domain below it, so its operations can fail
// with any of the domain errors. Transparent wrapping keeps the original
// messages and lets callers match on the domain variants.

use thiserror::Error;

use nexus_error::{
    ChainError, CorrelatorError, CryptoError, LedgerError, RegistryError, Retryable,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Correlator(#[from] CorrelatorError),

    #[error("engine configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }
}

impl Retryable for EngineError {
    fn is_retryable(&self) -> bool {
        match self {
            EngineError::Chain(err) => err.is_retryable(),
            EngineError::Registry(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn needs_requery(&self) -> bool {
        match self {
            EngineError::Chain(err) => err.needs_requery(),
            _ => false,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
