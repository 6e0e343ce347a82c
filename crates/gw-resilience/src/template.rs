use crate::preset::{PresetRegistry, ResiliencePreset};
use crate::strategy::Strategy;
use serde::{Deserialize, Serialize};

/// A partial, caller-supplied preset-like config to compare against the
/// registry, as posted to `/internal/resilience/config/recommend-template`.
/// Any field may be absent; absent fields are excluded from the comparison.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub retry_attempts: Option<u32>,
    pub circuit_breaker_threshold: Option<u32>,
    pub default_strategy: Option<Strategy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecommendation {
    pub suggested_template: Option<String>,
    pub confidence: f64,
    pub reasoning: String,
    pub available_templates: Vec<String>,
}

/// Compares `candidate` field-by-field against every registered preset on
/// `retry_attempts`, `circuit_breaker_threshold`, and `default_strategy`.
/// This is the arbitrary-config -> closest-named-preset comparison from
/// SPEC_FULL.md §4.1.1, distinct from [`crate::preset::recommend_for_environment`].
pub fn recommend_closest_template(
    registry: &PresetRegistry,
    candidate: &CandidateConfig,
) -> TemplateRecommendation {
    let available_templates: Vec<String> = registry.iter().map(|p| p.name.clone()).collect();

    if available_templates.is_empty() {
        return TemplateRecommendation {
            suggested_template: None,
            confidence: 0.0,
            reasoning: "no templates are registered to compare against".to_string(),
            available_templates,
        };
    }

    let mut best: Option<(String, f64)> = None;
    for preset in registry.iter() {
        let (matches, total) = field_match_ratio(candidate, preset);
        let confidence = if total == 0 { 0.5 } else { matches as f64 / total as f64 };
        if best.as_ref().map(|(_, c)| confidence > *c).unwrap_or(true) {
            best = Some((preset.name.clone(), confidence));
        }
    }

    match best {
        Some((name, confidence)) if confidence > 0.0 => TemplateRecommendation {
            suggested_template: Some(name.clone()),
            confidence,
            reasoning: format!("`{name}` matched the candidate on {:.0}% of compared fields", confidence * 100.0),
            available_templates,
        },
        Some((name, _)) => TemplateRecommendation {
            suggested_template: Some(name),
            confidence: 0.2,
            reasoning: "no template closely matches the candidate; showing the closest available"
                .to_string(),
            available_templates,
        },
        None => TemplateRecommendation {
            suggested_template: None,
            confidence: 0.0,
            reasoning: "no template closely matches the candidate configuration".to_string(),
            available_templates,
        },
    }
}

fn field_match_ratio(candidate: &CandidateConfig, preset: &ResiliencePreset) -> (usize, usize) {
    let mut matches = 0;
    let mut total = 0;

    if let Some(v) = candidate.retry_attempts {
        total += 1;
        if v == preset.retry_attempts {
            matches += 1;
        }
    }
    if let Some(v) = candidate.circuit_breaker_threshold {
        total += 1;
        if v == preset.circuit_breaker_threshold {
            matches += 1;
        }
    }
    if let Some(v) = candidate.default_strategy {
        total += 1;
        if v == preset.default_strategy {
            matches += 1;
        }
    }

    (matches, total)
}
