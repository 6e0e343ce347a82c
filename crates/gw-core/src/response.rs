use crate::operation::Operation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Sentiment polarity returned by the `sentiment` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub explanation: String,
}

/// The operation-specific payload of a response. Exactly one variant is
/// populated per response, matching the operation that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultPayload {
    Text(String),
    Sentiment(SentimentResult),
    List(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextProcessingResponse {
    pub operation: Operation,
    pub success: bool,
    pub result: ResultPayload,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub cache_hit: bool,
}

impl TextProcessingResponse {
    /// Returns a copy with `cache_hit` and `processing_time_ms` cleared, used
    /// to compare a cache hit against the original stored response (§8,
    /// scenario 1: "identical body minus the `cache_hit` flag and
    /// `processing_time_ms`").
    pub fn without_request_scoped_fields(&self) -> Self {
        let mut clone = self.clone();
        clone.cache_hit = false;
        clone.processing_time_ms = 0;
        clone
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub request_index: usize,
    pub status: BatchItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<TextProcessingResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTextProcessingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub total_requests: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
    pub total_processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}
