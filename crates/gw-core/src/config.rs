use crate::env::Environment;
use crate::error::ConfigurationError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Process-wide settings assembled once at startup from environment
/// variables. Performs no file I/O and no remote fetch; see SPEC_FULL.md
/// §6.2.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub environment: Environment,
    pub api_key: Option<String>,
    pub additional_api_keys: Vec<String>,
    pub auth_mode: AuthMode,
    pub resilience_preset: String,
    pub resilience_custom_config: Option<Value>,
    pub cache_preset: String,
    pub cache_redis_url: Option<String>,
    pub redis_encryption_key: Option<String>,
    pub input_max_length: usize,
    pub batch_concurrency: usize,
    pub enable_ai_cache: bool,
    pub enforce_auth: bool,
    pub enable_user_tracking: bool,
    pub enable_request_logging: bool,
    pub rate_limiting_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Simple,
    Advanced,
}

impl GatewaySettings {
    /// Reads all recognized environment variables, applying documented
    /// defaults. Never performs I/O beyond `std::env::var`.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let environment = Environment::from_env();

        let api_key = non_empty_env("API_KEY");
        let additional_api_keys = std::env::var("ADDITIONAL_API_KEYS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let auth_mode = match std::env::var("AUTH_MODE").ok().as_deref() {
            Some("advanced") => AuthMode::Advanced,
            _ => AuthMode::Simple,
        };

        let resilience_preset =
            std::env::var("RESILIENCE_PRESET").unwrap_or_else(|_| "simple".to_string());

        let resilience_custom_config = match std::env::var("RESILIENCE_CUSTOM_CONFIG") {
            Ok(raw) if !raw.trim().is_empty() => Some(serde_json::from_str(&raw).map_err(|e| {
                ConfigurationError::Invalid {
                    field: "RESILIENCE_CUSTOM_CONFIG".to_string(),
                    reason: e.to_string(),
                }
            })?),
            _ => None,
        };

        let cache_preset = std::env::var("CACHE_PRESET").unwrap_or_else(|_| "disabled".to_string());
        let cache_redis_url = non_empty_env("CACHE_REDIS_URL");
        let redis_encryption_key = non_empty_env("REDIS_ENCRYPTION_KEY");

        let input_max_length = parse_usize_env("INPUT_MAX_LENGTH", 2048)?;
        let batch_concurrency = parse_usize_env("BATCH_CONCURRENCY", 10)?;

        let settings = Self {
            environment,
            api_key,
            additional_api_keys,
            auth_mode,
            resilience_preset,
            resilience_custom_config,
            cache_preset,
            cache_redis_url,
            redis_encryption_key,
            input_max_length,
            batch_concurrency,
            enable_ai_cache: bool_env("ENABLE_AI_CACHE", true),
            enforce_auth: bool_env("ENFORCE_AUTH", true),
            enable_user_tracking: bool_env("ENABLE_USER_TRACKING", false),
            enable_request_logging: bool_env("ENABLE_REQUEST_LOGGING", false),
            rate_limiting_enabled: bool_env("RATE_LIMITING_ENABLED", false),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// All configured API keys, trimmed, in load order (`API_KEY` first).
    pub fn all_api_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        if let Some(k) = &self.api_key {
            keys.push(k.clone());
        }
        keys.extend(self.additional_api_keys.iter().cloned());
        keys
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.environment == Environment::Production && self.all_api_keys().is_empty() {
            return Err(ConfigurationError::Invalid {
                field: "API_KEY".to_string(),
                reason:
                    "production security policy requires at least one API key to be configured"
                        .to_string(),
            });
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn bool_env(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "enabled"),
        Err(_) => default,
    }
}

fn parse_usize_env(name: &str, default: usize) -> Result<usize, ConfigurationError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<usize>().map_err(|_| ConfigurationError::Invalid {
                field: name.to_string(),
                reason: format!("expected a non-negative integer, got `{raw}`"),
            })
        }
        _ => Ok(default),
    }
}

/// Merges a JSON object's fields over a preset's own JSON representation,
/// field by field, returning the merged object. Used to apply
/// `RESILIENCE_CUSTOM_CONFIG` on top of the selected preset.
pub fn merge_json_objects(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: BTreeMap<String, Value> =
                base_map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            for (k, v) in override_map {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged.into_iter().collect())
        }
        (_, overrides) => overrides.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_env_accepts_documented_truthy_values() {
        for v in ["true", "1", "yes", "enabled", "TRUE", "Yes"] {
            std::env::set_var("GW_TEST_BOOL", v);
            assert!(bool_env("GW_TEST_BOOL", false), "expected {v} to be truthy");
        }
        std::env::set_var("GW_TEST_BOOL", "nope");
        assert!(!bool_env("GW_TEST_BOOL", true));
        std::env::remove_var("GW_TEST_BOOL");
    }

    #[test]
    fn merge_overrides_only_named_fields() {
        let base = serde_json::json!({"retry_attempts": 3, "circuit_breaker_threshold": 5});
        let overrides = serde_json::json!({"retry_attempts": 7});
        let merged = merge_json_objects(&base, &overrides);
        assert_eq!(merged["retry_attempts"], 7);
        assert_eq!(merged["circuit_breaker_threshold"], 5);
    }
}
