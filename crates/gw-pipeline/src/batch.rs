use crate::pipeline::Pipeline;
use chrono::Utc;
use gw_core::{BatchItem, BatchItemStatus, BatchTextProcessingRequest, BatchTextProcessingResponse};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Default bound on concurrent in-flight items within one batch, per
/// SPEC_FULL.md §4.4; overridable via `GatewaySettings::batch_concurrency`.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 10;

/// Runs every request in a batch through [`Pipeline::process`] independently,
/// bounded by a semaphore, and assembles the aggregate response. One item's
/// failure never aborts the others. See SPEC_FULL.md §4.4.
pub async fn process_batch(
    pipeline: &Pipeline,
    batch: BatchTextProcessingRequest,
    concurrency: usize,
    deadline: Option<Duration>,
) -> BatchTextProcessingResponse {
    let started_at = Instant::now();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total_requests = batch.requests.len();

    let run_all = async {
        let mut tasks = Vec::with_capacity(total_requests);
        for (request_index, request) in batch.requests.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            tasks.push(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
                run_one(pipeline, request_index, request).await
            });
        }
        futures::future::join_all(tasks).await
    };

    let mut results = match deadline {
        Some(budget) => match tokio::time::timeout(budget, run_all).await {
            Ok(results) => results,
            Err(_elapsed) => {
                // The overall batch deadline fired: items that never got a
                // chance to run are reported as cancelled. Items already
                // in flight when the timeout elapsed are dropped along with
                // the future above, so they're folded into the same bucket
                // here rather than left unreported.
                (0..total_requests)
                    .map(|request_index| BatchItem {
                        request_index,
                        status: BatchItemStatus::Failed,
                        response: None,
                        error: Some("batch deadline exceeded before this item completed".to_string()),
                    })
                    .collect()
            }
        },
        None => run_all.await,
    };

    results.sort_by_key(|item| item.request_index);

    let completed = results.iter().filter(|r| r.status == BatchItemStatus::Completed).count();
    let failed = results.len() - completed;

    BatchTextProcessingResponse {
        batch_id: batch.batch_id,
        total_requests,
        completed,
        failed,
        results,
        total_processing_time_ms: started_at.elapsed().as_millis() as u64,
        timestamp: Utc::now(),
    }
}

async fn run_one(
    pipeline: &Pipeline,
    request_index: usize,
    request: gw_core::TextProcessingRequest,
) -> BatchItem {
    match pipeline.process(&request).await {
        Ok(response) => BatchItem {
            request_index,
            status: BatchItemStatus::Completed,
            response: Some(response),
            error: None,
        },
        Err(err) => BatchItem {
            request_index,
            status: BatchItemStatus::Failed,
            response: None,
            error: Some(err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{EchoProvider, ProviderError, ScriptedProvider};
    use gw_cache::{CacheManager, CacheManagerConfig};
    use gw_core::{AuthMode, Environment, FeatureContext, GatewaySettings, Operation, TextProcessingRequest};
    use gw_resilience::{simple_preset, ResilienceEngine};
    use std::collections::BTreeMap;

    fn settings() -> GatewaySettings {
        GatewaySettings {
            environment: Environment::Development,
            api_key: None,
            additional_api_keys: vec![],
            auth_mode: AuthMode::Simple,
            resilience_preset: "simple".to_string(),
            resilience_custom_config: None,
            cache_preset: "memory".to_string(),
            cache_redis_url: None,
            redis_encryption_key: None,
            input_max_length: 2048,
            batch_concurrency: 10,
            enable_ai_cache: false,
            enforce_auth: true,
            enable_user_tracking: false,
            enable_request_logging: false,
            rate_limiting_enabled: false,
        }
    }

    fn pipeline_with(provider: Arc<dyn crate::provider::Provider>) -> Pipeline {
        let cache = CacheManager::new(&CacheManagerConfig::default());
        let resilience = ResilienceEngine::new(simple_preset());
        Pipeline::new(&settings(), FeatureContext::default(), cache, resilience, provider).unwrap()
    }

    fn request(seed: char) -> TextProcessingRequest {
        TextProcessingRequest::new(seed.to_string().repeat(20), Operation::Summarize, None, BTreeMap::new(), None)
            .unwrap()
    }

    #[tokio::test]
    async fn all_items_complete_independently_and_preserve_order() {
        let pipeline = pipeline_with(Arc::new(EchoProvider));
        let batch = BatchTextProcessingRequest {
            requests: vec![request('a'), request('b'), request('c')],
            batch_id: Some("batch-1".to_string()),
        };

        let response = process_batch(&pipeline, batch, DEFAULT_BATCH_CONCURRENCY, None).await;
        assert_eq!(response.total_requests, 3);
        assert_eq!(response.completed, 3);
        assert_eq!(response.failed, 0);
        let indices: Vec<usize> = response.results.iter().map(|r| r.request_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_rest() {
        let provider = ScriptedProvider::always_fail(ProviderError::Permanent("nope".to_string()));
        let pipeline = pipeline_with(Arc::new(provider));
        let batch = BatchTextProcessingRequest {
            requests: vec![request('x'), request('y')],
            batch_id: None,
        };

        let response = process_batch(&pipeline, batch, DEFAULT_BATCH_CONCURRENCY, None).await;
        assert_eq!(response.total_requests, 2);
        assert_eq!(response.failed, 2);
        assert!(response.results.iter().all(|r| r.status == BatchItemStatus::Failed));
    }

    #[tokio::test]
    async fn exceeding_the_deadline_marks_items_as_cancelled() {
        let provider = ScriptedProvider::new([crate::provider::ScriptedOutcome::Delay(Duration::from_millis(200))]);
        let pipeline = pipeline_with(Arc::new(provider));
        let batch = BatchTextProcessingRequest { requests: vec![request('z')], batch_id: None };

        let response =
            process_batch(&pipeline, batch, DEFAULT_BATCH_CONCURRENCY, Some(Duration::from_millis(10))).await;
        assert_eq!(response.failed, 1);
        assert!(response.results[0].error.as_deref().unwrap().contains("deadline"));
    }
}
