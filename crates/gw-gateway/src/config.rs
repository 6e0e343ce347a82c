use gw_cache::{
    CacheManagerConfig, RedisTierConfig, DEFAULT_COMPRESSION_LEVEL, DEFAULT_COMPRESSION_THRESHOLD,
    DEFAULT_MAX_SIZE, DEFAULT_TTL,
};
use gw_core::{merge_json_objects, ConfigurationError, GatewaySettings};
use gw_resilience::{PresetRegistry, ResiliencePreset};
use std::time::Duration;

/// Resolves `settings.resilience_preset` against `registry`, applying any
/// `RESILIENCE_CUSTOM_CONFIG` override field-by-field on top. See
/// SPEC_FULL.md §6.2, §4.1.
pub fn resolve_resilience_preset(
    settings: &GatewaySettings,
    registry: &PresetRegistry,
) -> Result<ResiliencePreset, ConfigurationError> {
    let base = registry.get(&settings.resilience_preset).ok_or_else(|| ConfigurationError::Invalid {
        field: "RESILIENCE_PRESET".to_string(),
        reason: format!("unknown preset `{}`", settings.resilience_preset),
    })?;

    let Some(overrides) = &settings.resilience_custom_config else {
        return Ok(base.clone());
    };

    let base_value = serde_json::to_value(base).expect("ResiliencePreset always serializes");
    let merged = merge_json_objects(&base_value, overrides);
    serde_json::from_value(merged).map_err(|e| ConfigurationError::Invalid {
        field: "RESILIENCE_CUSTOM_CONFIG".to_string(),
        reason: e.to_string(),
    })
}

/// Resolves `settings.cache_preset` plus the Redis/encryption environment
/// variables into a [`CacheManagerConfig`]. `disabled` never wires the Redis
/// tier even if a URL happens to be configured; every other named preset
/// wires it when both `CACHE_REDIS_URL` and `REDIS_ENCRYPTION_KEY` are
/// present (absent either, `CacheManager::connect` falls back to
/// memory-only per §4.2). The `ai-*` presets lower the compression
/// threshold, since AI responses compress well even at modest sizes. See
/// SPEC_FULL.md §4.2, §6.2.
pub fn resolve_cache_config(settings: &GatewaySettings) -> Result<CacheManagerConfig, ConfigurationError> {
    let (memory_max_size, memory_default_ttl, compression_threshold) = match settings.cache_preset.as_str() {
        "disabled" => (DEFAULT_MAX_SIZE, DEFAULT_TTL, DEFAULT_COMPRESSION_THRESHOLD),
        "development" => (200, Duration::from_secs(300), DEFAULT_COMPRESSION_THRESHOLD),
        "production" => (5000, DEFAULT_TTL, DEFAULT_COMPRESSION_THRESHOLD),
        "ai-development" => (200, Duration::from_secs(300), 500),
        "ai-production" => (5000, DEFAULT_TTL, 500),
        other => {
            return Err(ConfigurationError::Invalid {
                field: "CACHE_PRESET".to_string(),
                reason: format!("unknown cache preset `{other}`"),
            })
        }
    };

    let redis = if settings.cache_preset == "disabled" {
        None
    } else {
        match (&settings.cache_redis_url, &settings.redis_encryption_key) {
            (Some(url), Some(_)) => Some(RedisTierConfig { url: url.clone(), ..RedisTierConfig::default() }),
            _ => None,
        }
    };

    let encryption_key = match &settings.redis_encryption_key {
        Some(raw) => Some(decode_encryption_key(raw)?),
        None => None,
    };

    Ok(CacheManagerConfig {
        memory_max_size,
        memory_default_ttl,
        compression_threshold,
        compression_level: DEFAULT_COMPRESSION_LEVEL,
        redis,
        encryption_key,
    })
}

fn decode_encryption_key(raw: &str) -> Result<[u8; 32], ConfigurationError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD.decode(raw).map_err(|e| ConfigurationError::Invalid {
        field: "REDIS_ENCRYPTION_KEY".to_string(),
        reason: format!("not valid base64: {e}"),
    })?;
    bytes.try_into().map_err(|v: Vec<u8>| ConfigurationError::Invalid {
        field: "REDIS_ENCRYPTION_KEY".to_string(),
        reason: format!("must decode to 32 bytes, got {}", v.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::{AuthMode, Environment};

    fn settings() -> GatewaySettings {
        GatewaySettings {
            environment: Environment::Development,
            api_key: None,
            additional_api_keys: vec![],
            auth_mode: AuthMode::Simple,
            resilience_preset: "simple".to_string(),
            resilience_custom_config: None,
            cache_preset: "disabled".to_string(),
            cache_redis_url: None,
            redis_encryption_key: None,
            input_max_length: 2048,
            batch_concurrency: 10,
            enable_ai_cache: true,
            enforce_auth: true,
            enable_user_tracking: false,
            enable_request_logging: false,
            rate_limiting_enabled: false,
        }
    }

    #[test]
    fn unknown_resilience_preset_is_a_configuration_error() {
        let mut s = settings();
        s.resilience_preset = "nonexistent".to_string();
        let registry = PresetRegistry::with_defaults();
        assert!(resolve_resilience_preset(&s, &registry).is_err());
    }

    #[test]
    fn custom_config_overrides_only_named_fields() {
        let mut s = settings();
        s.resilience_custom_config = Some(serde_json::json!({"retry_attempts": 9}));
        let registry = PresetRegistry::with_defaults();
        let preset = resolve_resilience_preset(&s, &registry).unwrap();
        assert_eq!(preset.retry_attempts, 9);
        assert_eq!(preset.name, "simple");
        assert_eq!(preset.circuit_breaker_threshold, registry.get("simple").unwrap().circuit_breaker_threshold);
    }

    #[test]
    fn disabled_cache_preset_never_wires_redis() {
        let mut s = settings();
        s.cache_redis_url = Some("redis://example:6379".to_string());
        s.redis_encryption_key = Some(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [0u8; 32]));
        let config = resolve_cache_config(&s).unwrap();
        assert!(config.redis.is_none());
    }

    #[test]
    fn production_preset_wires_redis_when_fully_configured() {
        let mut s = settings();
        s.cache_preset = "ai-production".to_string();
        s.cache_redis_url = Some("rediss://example:6380".to_string());
        s.redis_encryption_key = Some(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [0u8; 32]));
        let config = resolve_cache_config(&s).unwrap();
        assert!(config.redis.is_some());
        assert_eq!(config.compression_threshold, 500);
    }

    #[test]
    fn missing_encryption_key_leaves_redis_unwired() {
        let mut s = settings();
        s.cache_preset = "production".to_string();
        s.cache_redis_url = Some("redis://example:6379".to_string());
        let config = resolve_cache_config(&s).unwrap();
        assert!(config.redis.is_none());
    }

    #[test]
    fn unknown_cache_preset_is_a_configuration_error() {
        let mut s = settings();
        s.cache_preset = "bogus".to_string();
        assert!(resolve_cache_config(&s).is_err());
    }
}
