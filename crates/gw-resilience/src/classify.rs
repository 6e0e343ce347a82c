use std::time::Duration;

/// How a failure raised by the wrapped operation should be treated by the
/// retry policy. See SPEC_FULL.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network/timeout/5xx/rate-limit-without-retry-after: consumes an
    /// attempt, counts against the circuit breaker, backs off and retries.
    Transient,
    /// Validation/authentication/4xx-non-rate-limit: fails immediately,
    /// never retried, never counted against the circuit breaker.
    Permanent,
    /// Rate-limited with a server-provided `Retry-After`; honored instead of
    /// the strategy's own backoff.
    RateLimited { retry_after: Option<Duration> },
}

impl FailureKind {
    /// Whether this failure should consume a retry attempt and count
    /// against the circuit breaker.
    pub fn counts_against_circuit(self) -> bool {
        !matches!(self, FailureKind::Permanent)
    }

    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureKind::Permanent)
    }
}

/// Implemented by the caller's error type to tell the resilience engine how
/// to classify a failure. A blanket impl is deliberately not provided:
/// classification is domain-specific and must be explicit.
pub trait Classify {
    fn classify(&self) -> FailureKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum DemoError {
        Timeout,
        BadRequest,
        TooManyRequests(Option<Duration>),
    }

    impl Classify for DemoError {
        fn classify(&self) -> FailureKind {
            match self {
                DemoError::Timeout => FailureKind::Transient,
                DemoError::BadRequest => FailureKind::Permanent,
                DemoError::TooManyRequests(d) => FailureKind::RateLimited { retry_after: *d },
            }
        }
    }

    #[test]
    fn permanent_does_not_count_against_circuit() {
        assert!(!DemoError::BadRequest.classify().counts_against_circuit());
        assert!(DemoError::Timeout.classify().counts_against_circuit());
        assert!(DemoError::TooManyRequests(None).classify().counts_against_circuit());
    }
}
