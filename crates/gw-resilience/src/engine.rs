use crate::circuit::Circuit;
use crate::classify::{Classify, FailureKind};
use crate::error::ResilienceError;
use crate::preset::ResiliencePreset;
use gw_core::Operation;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The per-attempt deadline applied when an operation does not override it.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// A marker error signaling that an attempt exceeded its per-attempt
/// deadline. Callers' error types must provide a conversion so the engine
/// can fold a bare timeout into the same transient-failure path as any
/// other error (§4.1: "Exceeding the deadline is a transient failure").
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("attempt exceeded its deadline")]
pub struct AttemptTimedOut;

/// Wraps an arbitrary upstream call with retry + circuit-breaker + timeout
/// semantics selected per operation from the active preset. See
/// SPEC_FULL.md §4.1, "Contract".
pub struct ResilienceEngine {
    preset: ResiliencePreset,
    attempt_timeout: Duration,
    circuits: Mutex<HashMap<String, Arc<Circuit>>>,
}

impl ResilienceEngine {
    pub fn new(preset: ResiliencePreset) -> Self {
        Self { preset, attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT, circuits: Mutex::new(HashMap::new()) }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn preset(&self) -> &ResiliencePreset {
        &self.preset
    }

    fn circuit_for(&self, target: &str) -> Arc<Circuit> {
        let mut circuits = self.circuits.lock();
        circuits
            .entry(target.to_string())
            .or_insert_with(|| {
                Arc::new(Circuit::new(
                    target,
                    self.preset.circuit_breaker_threshold,
                    Duration::from_secs(self.preset.recovery_timeout_seconds),
                ))
            })
            .clone()
    }

    /// Returns a snapshot of every circuit this engine has created so far,
    /// for health/introspection endpoints.
    pub fn circuit_snapshots(&self) -> HashMap<String, crate::circuit::CircuitSnapshot> {
        self.circuits.lock().iter().map(|(k, v)| (k.clone(), v.snapshot())).collect()
    }

    /// `execute(operation, fn) -> result | error`. `fn` is called again on
    /// each retry attempt (the closure must rebuild its future); it is
    /// assumed idempotent from the engine's perspective.
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: Operation,
        target: &str,
        mut f: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + From<AttemptTimedOut>,
    {
        let strategy = self.preset.strategy_for(operation);
        let params = strategy.params();
        let circuit = self.circuit_for(target);

        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let permit = match circuit.try_acquire() {
                Ok(permit) => permit,
                Err(retry_at) => {
                    return Err(ResilienceError::CircuitOpen { target: target.to_string(), retry_at })
                }
            };

            let outcome = tokio::time::timeout(self.attempt_timeout, f())
                .await
                .unwrap_or_else(|_elapsed| Err(E::from(AttemptTimedOut)));

            match outcome {
                Ok(value) => {
                    permit.on_success();
                    return Ok(value);
                }
                Err(err) => {
                    let kind = err.classify();
                    if !kind.counts_against_circuit() {
                        permit.on_ignored();
                        return Err(ResilienceError::Permanent(err));
                    }

                    permit.on_failure();

                    if attempt >= params.max_attempts {
                        return Err(ResilienceError::RetryExhausted { cause: err, attempts: attempt });
                    }

                    let delay = match kind {
                        FailureKind::RateLimited { retry_after: Some(d) } => d,
                        _ => params.backoff_delay(attempt),
                    };
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::simple_preset;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct DemoError(FailureKind);

    impl Classify for DemoError {
        fn classify(&self) -> FailureKind {
            self.0
        }
    }

    impl From<AttemptTimedOut> for DemoError {
        fn from(_: AttemptTimedOut) -> Self {
            DemoError(FailureKind::Transient)
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_try() {
        let engine = ResilienceEngine::new(simple_preset());
        let result: Result<&str, ResilienceError<DemoError>> =
            engine.execute(Operation::Summarize, "t", || async { Ok("ok") }).await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let engine = ResilienceEngine::new(simple_preset()).with_attempt_timeout(Duration::from_millis(50));
        let calls = AtomicU32::new(0);
        let result = engine
            .execute(Operation::Summarize, "t2", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(DemoError(FailureKind::Transient))
                    } else {
                        Ok::<_, DemoError>("ok")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_does_not_retry_or_open_circuit() {
        let mut preset = simple_preset();
        preset.circuit_breaker_threshold = 1;
        let engine = ResilienceEngine::new(preset);
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = engine
            .execute(Operation::Summarize, "t3", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DemoError(FailureKind::Permanent)) }
            })
            .await;
        assert!(matches!(result, Err(ResilienceError::Permanent(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // circuit must still be closed: a subsequent transient failure alone
        // should not be enough to open a threshold=1 breaker twice over.
        let snapshot = engine.circuit_snapshots();
        assert_eq!(snapshot.get("t3").unwrap().failure_count, 0);
    }

    #[tokio::test]
    async fn exhausting_attempts_surfaces_retry_exhausted() {
        let mut preset = simple_preset();
        preset.default_strategy = crate::strategy::Strategy::Aggressive; // max_attempts = 2
        preset.circuit_breaker_threshold = 20;
        let engine = ResilienceEngine::new(preset).with_attempt_timeout(Duration::from_millis(50));
        let result: Result<(), _> = engine
            .execute(Operation::Summarize, "t4", || async { Err(DemoError(FailureKind::Transient)) })
            .await;
        assert!(matches!(result, Err(ResilienceError::RetryExhausted { attempts: 2, .. })));
    }

    #[tokio::test]
    async fn circuit_opens_and_fails_fast() {
        let mut preset = simple_preset();
        preset.circuit_breaker_threshold = 2;
        preset.default_strategy = crate::strategy::Strategy::Aggressive;
        let engine = ResilienceEngine::new(preset).with_attempt_timeout(Duration::from_millis(50));

        // Exhaust attempts against target "t5" enough times to cross the
        // breaker's threshold (each execute() call contributes up to
        // max_attempts=2 failures).
        let _ = engine
            .execute::<_, _, (), DemoError>(Operation::Qa, "t5", || async {
                Err(DemoError(FailureKind::Transient))
            })
            .await;

        let result: Result<(), _> = engine
            .execute(Operation::Qa, "t5", || async { Err(DemoError(FailureKind::Transient)) })
            .await;
        assert!(matches!(result, Err(ResilienceError::CircuitOpen { .. })));
    }
}
