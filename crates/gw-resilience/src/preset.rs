use crate::strategy::Strategy;
use gw_core::{Environment, FeatureContext, Operation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const RETRY_ATTEMPTS_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
pub const CIRCUIT_THRESHOLD_RANGE: std::ops::RangeInclusive<u32> = 1..=20;
pub const RECOVERY_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 10..=600;

/// An immutable, serializable bundle of resilience parameters. See
/// SPEC_FULL.md §3 "Resilience preset".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResiliencePreset {
    pub name: String,
    pub description: String,
    pub retry_attempts: u32,
    pub circuit_breaker_threshold: u32,
    pub recovery_timeout_seconds: u64,
    pub default_strategy: Strategy,
    pub operation_overrides: BTreeMap<Operation, Strategy>,
    pub environment_contexts: Vec<Environment>,
}

impl ResiliencePreset {
    /// The strategy in effect for `operation`: the override if present,
    /// otherwise `default_strategy`.
    pub fn strategy_for(&self, operation: Operation) -> Strategy {
        self.operation_overrides.get(&operation).copied().unwrap_or(self.default_strategy)
    }

    pub fn validate(&self) -> PresetValidation {
        let mut errors = Vec::new();
        let warnings = Vec::new();
        let mut suggestions = Vec::new();

        if !RETRY_ATTEMPTS_RANGE.contains(&self.retry_attempts) {
            errors.push(format!(
                "retry_attempts must be in [{}, {}], got {}",
                RETRY_ATTEMPTS_RANGE.start(),
                RETRY_ATTEMPTS_RANGE.end(),
                self.retry_attempts
            ));
        }
        if !CIRCUIT_THRESHOLD_RANGE.contains(&self.circuit_breaker_threshold) {
            errors.push(format!(
                "circuit_breaker_threshold must be in [{}, {}], got {}",
                CIRCUIT_THRESHOLD_RANGE.start(),
                CIRCUIT_THRESHOLD_RANGE.end(),
                self.circuit_breaker_threshold
            ));
        }
        if !RECOVERY_TIMEOUT_RANGE.contains(&self.recovery_timeout_seconds) {
            errors.push(format!(
                "recovery_timeout_seconds must be in [{}, {}], got {}",
                RECOVERY_TIMEOUT_RANGE.start(),
                RECOVERY_TIMEOUT_RANGE.end(),
                self.recovery_timeout_seconds
            ));
        }
        if self.environment_contexts.is_empty() {
            errors.push("environment_contexts must not be empty".to_string());
            suggestions.push("assign at least one of development/testing/staging/production".to_string());
        }

        PresetValidation { is_valid: errors.is_empty(), errors, warnings, suggestions }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// The three presets shipped out of the box: `simple`, `development`,
/// `production`.
pub fn simple_preset() -> ResiliencePreset {
    ResiliencePreset {
        name: "simple".to_string(),
        description: "Minimal resilience suitable for local experimentation".to_string(),
        retry_attempts: 2,
        circuit_breaker_threshold: 5,
        recovery_timeout_seconds: 30,
        default_strategy: Strategy::Balanced,
        operation_overrides: BTreeMap::new(),
        environment_contexts: vec![Environment::Development, Environment::Testing],
    }
}

pub fn development_preset() -> ResiliencePreset {
    let mut overrides = BTreeMap::new();
    overrides.insert(Operation::Qa, Strategy::Aggressive);
    ResiliencePreset {
        name: "development".to_string(),
        description: "Fast-failing defaults tuned for iterating locally".to_string(),
        retry_attempts: 2,
        circuit_breaker_threshold: 5,
        recovery_timeout_seconds: 20,
        default_strategy: Strategy::Aggressive,
        operation_overrides: overrides,
        environment_contexts: vec![Environment::Development, Environment::Testing, Environment::Staging],
    }
}

pub fn production_preset() -> ResiliencePreset {
    let mut overrides = BTreeMap::new();
    overrides.insert(Operation::Qa, Strategy::Critical);
    overrides.insert(Operation::Summarize, Strategy::Conservative);
    ResiliencePreset {
        name: "production".to_string(),
        description: "Conservative defaults favoring availability over latency".to_string(),
        retry_attempts: 5,
        circuit_breaker_threshold: 10,
        recovery_timeout_seconds: 60,
        default_strategy: Strategy::Conservative,
        operation_overrides: overrides,
        environment_contexts: vec![Environment::Staging, Environment::Production],
    }
}

/// The process-wide, read-only set of registered presets. Built once at
/// startup; see SPEC_FULL.md §9 "Global state".
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    presets: BTreeMap<String, ResiliencePreset>,
}

impl PresetRegistry {
    /// Registers the three built-in presets. Custom deployments may add
    /// further entries before the registry is handed to the engine; once
    /// constructed it should not be mutated again (it is not behind
    /// interior mutability).
    pub fn with_defaults() -> Self {
        let mut presets = BTreeMap::new();
        for preset in [simple_preset(), development_preset(), production_preset()] {
            presets.insert(preset.name.clone(), preset);
        }
        Self { presets }
    }

    pub fn insert(&mut self, preset: ResiliencePreset) {
        self.presets.insert(preset.name.clone(), preset);
    }

    pub fn get(&self, name: &str) -> Option<&ResiliencePreset> {
        self.presets.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResiliencePreset> {
        self.presets.values()
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Output of the environment -> preset recommendation routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetRecommendation {
    pub preset_name: String,
    pub confidence: f64,
    pub reasoning: String,
    pub environment_detected: Environment,
}

/// A pure function from `(environment, feature_context)` to a recommended
/// preset with a confidence score. Exact environment matches score highest,
/// pattern-derived matches lower, and anything unrecognized falls back to
/// `simple` at 0.50. See SPEC_FULL.md §4.1.
pub fn recommend_for_environment(
    environment: Environment,
    feature_context: FeatureContext,
) -> PresetRecommendation {
    if feature_context.security_enforcement && environment != Environment::Production {
        return PresetRecommendation {
            preset_name: "production".to_string(),
            confidence: 0.85,
            reasoning: "security_enforcement override forces production-strict resilience"
                .to_string(),
            environment_detected: environment,
        };
    }

    match environment {
        Environment::Production => PresetRecommendation {
            preset_name: "production".to_string(),
            confidence: 0.95,
            reasoning: "exact match on environment `production`".to_string(),
            environment_detected: environment,
        },
        Environment::Staging => PresetRecommendation {
            preset_name: "production".to_string(),
            confidence: 0.80,
            reasoning: "pattern match: staging environments use production-shaped resilience"
                .to_string(),
            environment_detected: environment,
        },
        Environment::Development | Environment::Testing => PresetRecommendation {
            preset_name: "development".to_string(),
            confidence: 0.90,
            reasoning: format!("exact match on environment `{environment}`"),
            environment_detected: environment,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_presets_are_valid() {
        for preset in PresetRegistry::with_defaults().iter() {
            let validation = preset.validate();
            assert!(validation.is_valid, "{}: {:?}", preset.name, validation.errors);
        }
    }

    #[test]
    fn retry_attempts_boundary() {
        let mut preset = simple_preset();
        preset.retry_attempts = 1;
        assert!(preset.validate().is_valid);
        preset.retry_attempts = 10;
        assert!(preset.validate().is_valid);
        preset.retry_attempts = 0;
        assert!(!preset.validate().is_valid);
        preset.retry_attempts = 11;
        assert!(!preset.validate().is_valid);
    }

    #[test]
    fn production_environment_recommends_production_with_high_confidence() {
        let rec = recommend_for_environment(Environment::Production, FeatureContext::default());
        assert_eq!(rec.preset_name, "production");
        assert!(rec.confidence >= 0.85);
    }

    #[test]
    fn security_enforcement_overrides_environment() {
        let ctx = FeatureContext { security_enforcement: true, ..Default::default() };
        let rec = recommend_for_environment(Environment::Development, ctx);
        assert_eq!(rec.preset_name, "production");
    }
}
