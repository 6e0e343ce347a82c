//! Retry, circuit breaker, preset, and recommendation engine wrapping an
//! arbitrary upstream call with resilience semantics selected per
//! operation. See SPEC_FULL.md §4.1.

mod circuit;
mod classify;
mod engine;
mod error;
pub mod events;
mod preset;
mod strategy;
mod template;

pub use circuit::{Circuit, CircuitPermit, CircuitSnapshot, CircuitState};
pub use classify::{Classify, FailureKind};
pub use engine::{AttemptTimedOut, ResilienceEngine, DEFAULT_ATTEMPT_TIMEOUT};
pub use error::ResilienceError;
pub use preset::{
    development_preset, production_preset, recommend_for_environment, simple_preset,
    PresetRecommendation, PresetRegistry, PresetValidation, ResiliencePreset,
    CIRCUIT_THRESHOLD_RANGE, RECOVERY_TIMEOUT_RANGE, RETRY_ATTEMPTS_RANGE,
};
pub use strategy::{Strategy, StrategyParams};
pub use template::{recommend_closest_template, CandidateConfig, TemplateRecommendation};
