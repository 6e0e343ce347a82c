use std::time::Instant;
use thiserror::Error;

/// Errors surfaced by [`crate::engine::ResilienceEngine::execute`].
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The circuit is open for this target; the call was not attempted.
    #[error("circuit is open for `{target}`; retry after {retry_at:?}")]
    CircuitOpen { target: String, retry_at: Instant },

    /// All retry attempts were exhausted; carries the last transient error.
    #[error("retries exhausted after {attempts} attempt(s): {cause}")]
    RetryExhausted { cause: E, attempts: u32 },

    /// A permanent failure surfaced unchanged, without consuming a retry
    /// attempt or counting against the circuit breaker.
    #[error("permanent failure: {0}")]
    Permanent(E),
}

impl<E> ResilienceError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            ResilienceError::RetryExhausted { cause, .. } => Some(cause),
            ResilienceError::Permanent(e) => Some(e),
            ResilienceError::CircuitOpen { .. } => None,
        }
    }
}
