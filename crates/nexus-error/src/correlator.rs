// Cross-chain correlation error types

use thiserror::Error;

use crate::{ErrorCode, ErrorDomain, NexusError, Retryable};

/// Correlator-specific error codes
pub mod codes {
    use crate::ErrorCode;

    // Correlator error codes start with 5000
    pub const OPERATION_NOT_FOUND: ErrorCode = ErrorCode(5001);
    pub const SOURCE_NOT_CONFIRMED: ErrorCode = ErrorCode(5002);
    pub const ILLEGAL_TRANSITION: ErrorCode = ErrorCode(5003);
}

/// Errors raised by the cross-chain correlator
#[derive(Error, Debug, Clone)]
pub enum CorrelatorError {
    #[error("operation not found: {0}")]
    OperationNotFound(String),

    /// `link_destination` is only legal after the source transaction is
    /// confirmed on its chain
    #[error("source transaction not confirmed for operation {0}")]
    SourceNotConfirmed(String),

    #[error("illegal operation transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

impl CorrelatorError {
    pub fn not_found(id: impl Into<String>) -> Self {
        CorrelatorError::OperationNotFound(id.into())
    }

    pub fn illegal_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        CorrelatorError::IllegalTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            CorrelatorError::OperationNotFound(_) => OPERATION_NOT_FOUND,
            CorrelatorError::SourceNotConfirmed(_) => SOURCE_NOT_CONFIRMED,
            CorrelatorError::IllegalTransition { .. } => ILLEGAL_TRANSITION,
        }
    }
}

impl NexusError for CorrelatorError {
    fn error_code(&self) -> &'static str {
        match self {
            CorrelatorError::OperationNotFound(_) => "CORRELATOR_OPERATION_NOT_FOUND",
            CorrelatorError::SourceNotConfirmed(_) => "CORRELATOR_SOURCE_NOT_CONFIRMED",
            CorrelatorError::IllegalTransition { .. } => "CORRELATOR_ILLEGAL_TRANSITION",
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Correlator
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Retryable for CorrelatorError {
    fn is_retryable(&self) -> bool {
        false
    }
}

impl From<CorrelatorError> for Box<dyn NexusError> {
    fn from(err: CorrelatorError) -> Self {
        Box::new(err)
    }
}

/// Convenient Result type for correlator operations
pub type CorrelatorResult<T> = Result<T, CorrelatorError>;
