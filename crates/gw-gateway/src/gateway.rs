use crate::config::{resolve_cache_config, resolve_resilience_preset};
use gw_cache::CacheManager;
use gw_core::{
    BatchTextProcessingRequest, BatchTextProcessingResponse, ConfigurationError, FeatureContext,
    GatewayError, GatewaySettings, Operation, TextProcessingRequest, TextProcessingResponse,
};
use gw_observability::{aggregate_health, GatewayHealthReport, MetricRecord, MetricType, MetricsRingBuffer};
use gw_pipeline::{process_batch, Pipeline, Provider, PROVIDER_TARGET};
use gw_resilience::{CircuitState, PresetRegistry, ResilienceEngine};
use gw_security::Principal;
use std::sync::Arc;
use std::time::Instant;

/// The facade a transport surface wires one instance of per process: owns
/// the request pipeline, the preset registry backing the resilience-config
/// introspection endpoints, and the metrics ring buffer. Analogous to the
/// teacher's top-level `tower-resilience` meta-crate, except the composition
/// here is one concrete system rather than a menu of independently-enabled
/// layers, so there is no per-pattern feature gating -- every subsystem is
/// always present. See SPEC_FULL.md §2.1, §6.
pub struct Gateway {
    pipeline: Pipeline,
    presets: PresetRegistry,
    metrics: MetricsRingBuffer,
    version: String,
    redis_requested: bool,
    batch_concurrency: usize,
}

impl Gateway {
    /// Assembles a gateway from process settings, a feature-flag override,
    /// and the upstream provider. Fatal configuration problems (unknown
    /// preset name, malformed `RESILIENCE_CUSTOM_CONFIG`, malformed
    /// encryption key) surface here rather than mid-request.
    pub fn new(
        settings: &GatewaySettings,
        feature_context: FeatureContext,
        provider: Arc<dyn Provider>,
    ) -> Result<Self, ConfigurationError> {
        let presets = PresetRegistry::with_defaults();
        let preset = resolve_resilience_preset(settings, &presets)?;
        let resilience = ResilienceEngine::new(preset);

        let cache_config = resolve_cache_config(settings)?;
        let redis_requested = cache_config.redis.is_some();
        let cache = CacheManager::new(&cache_config);

        let pipeline = Pipeline::new(settings, feature_context, cache, resilience, provider)?;

        Ok(Self {
            pipeline,
            presets,
            metrics: MetricsRingBuffer::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            redis_requested,
            batch_concurrency: settings.batch_concurrency.max(1),
        })
    }

    /// Establishes the cache's Redis connection if one was configured.
    /// Idempotent; intended to run once at startup. Never fails outright --
    /// a Redis outage degrades to memory-only (§4.2) -- but a malformed
    /// encryption key was already caught by [`Gateway::new`], so this can
    /// only fail if settings changed between calls.
    pub async fn connect(&self, settings: &GatewaySettings) -> Result<(), ConfigurationError> {
        let cache_config = resolve_cache_config(settings)?;
        self.pipeline.cache().connect(&cache_config).await;
        Ok(())
    }

    /// Extracts and checks the caller's credential, per §4.5.
    pub fn authenticate(
        &self,
        authorization: Option<&str>,
        x_api_key: Option<&str>,
    ) -> Result<Principal, GatewayError> {
        Ok(self.pipeline.authenticate(authorization, x_api_key)?)
    }

    /// Runs one request through the pipeline, recording an `operation_call`
    /// metric regardless of outcome.
    pub async fn process(&self, request: &TextProcessingRequest) -> Result<TextProcessingResponse, GatewayError> {
        let started_at = Instant::now();
        let result = self.pipeline.process(request).await;
        let failed = result.is_err();
        self.record_operation_metric(request.operation, started_at.elapsed().as_millis() as u64, failed);
        Ok(result?)
    }

    /// Fans a batch out through the pipeline's bounded-concurrency
    /// orchestrator, using `BATCH_CONCURRENCY` from settings. Per-item
    /// failures never fail the batch as a whole (§4.4).
    pub async fn process_batch(&self, batch: BatchTextProcessingRequest) -> BatchTextProcessingResponse {
        process_batch(&self.pipeline, batch, self.batch_concurrency, None).await
    }

    /// The process-wide registry of named resilience presets, for the
    /// `/internal/resilience/config/templates*` endpoints.
    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    /// The append-only metrics ring buffer accumulated across every request
    /// this gateway has served.
    pub fn metrics(&self) -> &MetricsRingBuffer {
        &self.metrics
    }

    /// Aggregates provider, resilience, and cache health into the
    /// `/internal/health` shape (§6). `ai_model_available` and
    /// `resilience_healthy` are both derived from circuit state: the former
    /// from the provider's own circuit, the latter from every circuit this
    /// gateway has ever opened (today, just the one).
    pub async fn health(&self) -> GatewayHealthReport {
        let cache_report = self.pipeline.cache().health_check().await;
        let snapshots = self.pipeline.resilience().circuit_snapshots();
        let resilience_healthy = snapshots.values().all(|s| s.state != CircuitState::Open);
        let ai_model_available =
            snapshots.get(PROVIDER_TARGET).map(|s| s.state != CircuitState::Open).unwrap_or(true);

        aggregate_health(ai_model_available, resilience_healthy, &cache_report, self.redis_requested, self.version.clone())
    }

    fn record_operation_metric(&self, operation: Operation, duration_ms: u64, failed: bool) {
        let mut record =
            MetricRecord::new(MetricType::OperationCall).with_operation(operation).with_duration_ms(duration_ms);
        if failed {
            record = record.with_error("pipeline returned an error");
        }
        self.metrics.record(record);
    }
}
