// Error classification traits

/// Classifies an error as retryable or permanent.
///
/// Retryable errors may succeed on a later attempt (transient RPC or network
/// failures). Ambiguous outcomes such as confirmation timeouts are NOT
/// retryable as-is: the caller must re-query chain state before deciding,
/// to avoid double submission.
pub trait Retryable {
    /// Whether retrying the failed call, with backoff, can succeed
    fn is_retryable(&self) -> bool;

    /// Whether the outcome is ambiguous and state must be re-queried
    /// before any retry
    fn needs_requery(&self) -> bool {
        false
    }
}
