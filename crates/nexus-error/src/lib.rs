// Nexus Error Handling
// Central location for error types, traits, and handling utilities

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

// Re-export common error handling tools for convenience
pub use anyhow;
pub use thiserror;

mod chain;
mod correlator;
mod crypto;
mod ledger;
mod registry;
mod traits;

pub use chain::{ChainError, ChainResult};
pub use correlator::{CorrelatorError, CorrelatorResult};
pub use crypto::{CryptoError, CryptoResult};
pub use ledger::{LedgerError, LedgerResult};
pub use registry::{RegistryError, RegistryResult};
pub use traits::Retryable;

/// Error domains representing different components of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorDomain {
    Crypto,
    Chain,
    Registry,
    Ledger,
    Correlator,
    Store,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Crypto => write!(f, "crypto"),
            ErrorDomain::Chain => write!(f, "chain"),
            ErrorDomain::Registry => write!(f, "registry"),
            ErrorDomain::Ledger => write!(f, "ledger"),
            ErrorDomain::Correlator => write!(f, "correlator"),
            ErrorDomain::Store => write!(f, "store"),
        }
    }
}

/// Error code structure for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ErrorCode(pub u32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Base trait for all errors in the Nexus system.
pub trait NexusError: StdError + fmt::Debug + fmt::Display + Send + Sync + Any + 'static {
    /// Returns a unique static string code for this error type.
    fn error_code(&self) -> &'static str;

    /// Which component of the system the error belongs to.
    fn domain(&self) -> ErrorDomain;

    /// Indicates if the error is temporary and retrying might succeed.
    fn is_transient(&self) -> bool {
        false
    }

    /// Converts the error into a boxed trait object.
    fn into_boxed(self) -> Box<dyn NexusError>
    where
        Self: Sized,
    {
        Box::new(self)
    }

    /// Returns this error as a `&dyn Any` to allow downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Shorthand for a boxed NexusError
pub type BoxError = Box<dyn NexusError>;

/// Standard Result type using BoxError
pub type Result<T> = std::result::Result<T, BoxError>;
