//! Per-target circuit breaker state machine, grounded in the
//! `Closed`/`Open`/`HalfOpen` model this workspace's circuit breaker crate
//! used, simplified to the consecutive-failure-count trigger SPEC_FULL.md
//! §4.1 specifies (rather than a sliding failure-rate window).

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub opened_at: Option<Instant>,
}

struct Inner {
    failure_count: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    half_open_test_in_flight: bool,
}

/// A circuit breaker guarding a single logical target (one operation, per
/// SPEC_FULL.md's per-operation assumption).
pub struct Circuit {
    name: String,
    threshold: u32,
    recovery_timeout: Duration,
    state_atomic: Arc<AtomicU8>,
    inner: Mutex<Inner>,
}

impl Circuit {
    pub fn new(name: impl Into<String>, threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            threshold,
            recovery_timeout,
            state_atomic: Arc::new(AtomicU8::new(CircuitState::Closed as u8)),
            inner: Mutex::new(Inner {
                failure_count: 0,
                opened_at: None,
                last_failure_at: None,
                half_open_test_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.inner.lock();
        CircuitSnapshot { state: self.state(), failure_count: inner.failure_count, opened_at: inner.opened_at }
    }

    /// Returns `Ok(permit)` if a call may proceed, or `Err(retry_at)` if the
    /// circuit is open and should fail fast. Transitions `open -> half_open`
    /// when the recovery timeout has elapsed, admitting exactly one probe
    /// call; concurrent callers during the probe are rejected.
    pub fn try_acquire(&self) -> Result<CircuitPermit<'_>, Instant> {
        match self.state() {
            CircuitState::Closed => Ok(CircuitPermit { circuit: self, is_probe: false }),
            CircuitState::HalfOpen => {
                let mut inner = self.inner.lock();
                if inner.half_open_test_in_flight {
                    let retry_at = inner.opened_at.unwrap_or_else(Instant::now) + self.recovery_timeout;
                    Err(retry_at)
                } else {
                    inner.half_open_test_in_flight = true;
                    Ok(CircuitPermit { circuit: self, is_probe: true })
                }
            }
            CircuitState::Open => {
                let mut inner = self.inner.lock();
                let opened_at = inner.opened_at.unwrap_or_else(Instant::now);
                if opened_at.elapsed() >= self.recovery_timeout {
                    self.state_atomic.store(CircuitState::HalfOpen as u8, Ordering::Release);
                    inner.half_open_test_in_flight = true;
                    #[cfg(feature = "tracing")]
                    tracing::info!(target = %self.name, "circuit breaker transitioning to half-open");
                    Ok(CircuitPermit { circuit: self, is_probe: true })
                } else {
                    Err(opened_at + self.recovery_timeout)
                }
            }
        }
    }

    fn record_success(&self, was_probe: bool) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;
        inner.opened_at = None;
        if was_probe {
            inner.half_open_test_in_flight = false;
        }
        self.state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        #[cfg(feature = "metrics")]
        metrics::counter!("gateway_circuit_breaker_success_total", "target" => self.name.clone())
            .increment(1);
    }

    fn record_failure(&self, was_probe: bool) {
        let mut inner = self.inner.lock();
        inner.last_failure_at = Some(Instant::now());
        if was_probe {
            inner.half_open_test_in_flight = false;
            inner.opened_at = Some(Instant::now());
            self.state_atomic.store(CircuitState::Open as u8, Ordering::Release);
            #[cfg(feature = "tracing")]
            tracing::warn!(target = %self.name, "half-open probe failed, circuit re-opened");
            return;
        }

        inner.failure_count += 1;
        if inner.failure_count >= self.threshold {
            inner.opened_at = Some(Instant::now());
            self.state_atomic.store(CircuitState::Open as u8, Ordering::Release);
            #[cfg(feature = "tracing")]
            tracing::warn!(
                target = %self.name,
                failure_count = inner.failure_count,
                threshold = self.threshold,
                "circuit breaker opened"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!("gateway_circuit_breaker_opened_total", "target" => self.name.clone())
                .increment(1);
        }
    }

    /// Force the circuit closed, clearing failure history. Intended for
    /// tests and operator intervention, not normal request handling.
    pub fn force_closed(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;
        inner.opened_at = None;
        inner.half_open_test_in_flight = false;
        self.state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
    }
}

/// An admitted call. Must be resolved via [`CircuitPermit::on_success`] or
/// [`CircuitPermit::on_failure`] to update circuit state.
pub struct CircuitPermit<'a> {
    circuit: &'a Circuit,
    is_probe: bool,
}

impl CircuitPermit<'_> {
    pub fn on_success(self) {
        self.circuit.record_success(self.is_probe);
    }

    pub fn on_failure(self) {
        self.circuit.record_failure(self.is_probe);
    }

    /// Releases the permit without affecting failure bookkeeping, for
    /// permanent failures that must not count against the breaker. If this
    /// was the half-open probe, clears the in-flight flag so a subsequent
    /// call may probe again, but leaves `failure_count`/`state` untouched.
    pub fn on_ignored(self) {
        if self.is_probe {
            let mut inner = self.circuit.inner.lock();
            inner.half_open_test_in_flight = false;
        }
    }
}
