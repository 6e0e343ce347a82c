use crate::error::PipelineError;
use crate::prompt::assemble_prompt;
use crate::provider::Provider;
use chrono::Utc;
use gw_cache::{default_ttl_for, CacheManager};
use gw_core::{FeatureContext, GatewaySettings, Operation, TextProcessingRequest, TextProcessingResponse};
use gw_resilience::ResilienceEngine;
use gw_security::{extract_credential, sanitize_option_string, sanitize_text, validate_response, AuthGate, Principal};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// The target every request dispatches against in the resilience engine.
/// A single shared circuit models "the upstream provider is down", which is
/// the granularity SPEC_FULL.md §4.1/§5 describes for circuit breaker state.
pub const PROVIDER_TARGET: &str = "provider";

/// Wires auth, sanitization, caching, prompt assembly, the resilience
/// engine, and response validation into the nine ordered stages of §4.3.
/// One instance is shared across all requests in a process.
pub struct Pipeline {
    auth: AuthGate,
    cache: CacheManager,
    resilience: ResilienceEngine,
    provider: Arc<dyn Provider>,
    input_max_length: usize,
    ai_cache_enabled: bool,
}

impl Pipeline {
    pub fn new(
        settings: &GatewaySettings,
        feature_context: FeatureContext,
        cache: CacheManager,
        resilience: ResilienceEngine,
        provider: Arc<dyn Provider>,
    ) -> Result<Self, gw_core::ConfigurationError> {
        let auth = AuthGate::new(settings, feature_context)?;
        let ai_cache_enabled = feature_context.ai_cache_enabled.unwrap_or(settings.enable_ai_cache);

        Ok(Self {
            auth,
            cache,
            resilience,
            provider,
            input_max_length: settings.input_max_length,
            ai_cache_enabled,
        })
    }

    /// The cache tier backing this pipeline, for health checks and
    /// introspection endpoints that sit outside the nine request stages.
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// The resilience engine backing this pipeline, for the same reason.
    pub fn resilience(&self) -> &ResilienceEngine {
        &self.resilience
    }

    /// Whether this pipeline consults the cache tier at all, per the
    /// `ENABLE_AI_CACHE` setting and any [`FeatureContext`] override.
    pub fn ai_cache_enabled(&self) -> bool {
        self.ai_cache_enabled
    }

    /// Extracts and checks the caller's credential from the two accepted
    /// header shapes, per §4.5 "Protocol".
    pub fn authenticate(
        &self,
        authorization: Option<&str>,
        x_api_key: Option<&str>,
    ) -> Result<Principal, PipelineError> {
        let credential = extract_credential(authorization, x_api_key);
        Ok(self.auth.verify(credential.as_deref())?)
    }

    /// Runs the nine ordered stages of §4.3 for a single already-validated
    /// request. `started_at` marks the beginning of stage 2 (sanitization),
    /// per the spec's "`processing_time_ms` measured from stage 2".
    pub async fn process(
        &self,
        request: &TextProcessingRequest,
    ) -> Result<TextProcessingResponse, PipelineError> {
        let started_at = Instant::now();

        // Stage 2: sanitize input.
        let sanitized_text = sanitize_text(&request.text, self.input_max_length);
        let sanitized_question = request
            .question
            .as_deref()
            .map(|q| sanitize_text(q, self.input_max_length));
        let sanitized_options = sanitize_options(&request.options);

        // Stage 3: build cache key.
        let cache_key = gw_cache::build_key(
            request.operation,
            &sanitized_text,
            &sanitized_options,
            sanitized_question.as_deref(),
        );

        // Stage 4: cache lookup.
        if self.ai_cache_enabled {
            if let Some(hit) = self.lookup_cache(&cache_key).await {
                return Ok(self.finish_from_cache(hit, started_at));
            }
        }

        // Stage 5: assemble prompt.
        let prompt = assemble_prompt(
            request.operation,
            &sanitized_text,
            &string_options(&sanitized_options),
            sanitized_question.as_deref(),
        );

        // Stage 6: dispatch via the resilience engine.
        let provider = Arc::clone(&self.provider);
        let rendered = prompt.rendered.clone();
        let operation = request.operation;
        let raw = self
            .resilience
            .execute(operation, PROVIDER_TARGET, || {
                let provider = Arc::clone(&provider);
                let rendered = rendered.clone();
                async move { provider.call(&rendered, operation).await }
            })
            .await?;

        // Stage 7: validate response.
        let result = validate_response(operation, &raw, &prompt.system_instruction, &sanitized_text)?;

        let response = TextProcessingResponse {
            operation,
            success: true,
            result,
            metadata: BTreeMap::new(),
            processing_time_ms: started_at.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
            cache_hit: false,
        };

        // Stage 8: cache store.
        if self.ai_cache_enabled {
            self.store_cache(&cache_key, &response, operation).await;
        }

        // Stage 9: return.
        Ok(response)
    }

    async fn lookup_cache(&self, key: &str) -> Option<TextProcessingResponse> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).ok(),
            Ok(None) | Err(_) => None,
        }
    }

    async fn store_cache(&self, key: &str, response: &TextProcessingResponse, operation: Operation) {
        let cacheable = response.without_request_scoped_fields();
        if let Ok(bytes) = serde_json::to_vec(&cacheable) {
            let _ = self.cache.set(key, &bytes, default_ttl_for(operation)).await;
        }
    }

    fn finish_from_cache(&self, hit: TextProcessingResponse, started_at: Instant) -> TextProcessingResponse {
        TextProcessingResponse {
            cache_hit: true,
            processing_time_ms: started_at.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
            ..hit
        }
    }
}

/// Strips dangerous characters from each string-valued option (§4.3 stage
/// 2); non-string values pass through unchanged.
fn sanitize_options(options: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    options
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => (k.clone(), Value::String(sanitize_option_string(s))),
            other => (k.clone(), other.clone()),
        })
        .collect()
}

/// Flattens string-valued options for prompt-template interpolation (§4.3
/// stage 5 only reads simple scalars like `max_length`/`num_questions`).
fn string_options(options: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    options
        .iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k.clone(), s.clone())),
            Value::Number(n) => Some((k.clone(), n.to_string())),
            _ => None,
        })
        .collect()
}
