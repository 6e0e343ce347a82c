use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Minimum and maximum accepted length for `TextProcessingRequest::text`, in chars.
pub const TEXT_MIN_LEN: usize = 10;
pub const TEXT_MAX_LEN: usize = 10_000;

/// Minimum and maximum accepted batch size.
pub const BATCH_MIN_LEN: usize = 1;
pub const BATCH_MAX_LEN: usize = 200;

/// A single text-processing job.
///
/// Construct via [`TextProcessingRequest::new`], which enforces the length and
/// `qa`-requires-`question` invariants from the data model; hand-building the
/// struct literal (the fields are `pub` for serde and for tests) bypasses those
/// checks, so prefer `new` outside of test fixtures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextProcessingRequest {
    pub text: String,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("text must be at least {min} characters after trimming, got {actual}")]
    TextTooShort { min: usize, actual: usize },
    #[error("text must be at most {max} characters, got {actual}")]
    TextTooLong { max: usize, actual: usize },
    #[error("text must be non-empty after trimming")]
    TextEmpty,
    #[error("operation `qa` requires a non-empty `question` field")]
    MissingQuestion,
    #[error("`question` is only meaningful for operation `qa`")]
    UnexpectedQuestion,
}

impl TextProcessingRequest {
    pub fn new(
        text: impl Into<String>,
        operation: Operation,
        question: Option<String>,
        options: BTreeMap<String, Value>,
        user_metadata: Option<BTreeMap<String, Value>>,
    ) -> Result<Self, RequestValidationError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RequestValidationError::TextEmpty);
        }
        let len = trimmed.chars().count();
        if len < TEXT_MIN_LEN {
            return Err(RequestValidationError::TextTooShort { min: TEXT_MIN_LEN, actual: len });
        }
        if len > TEXT_MAX_LEN {
            return Err(RequestValidationError::TextTooLong { max: TEXT_MAX_LEN, actual: len });
        }

        let question = match (operation.requires_question(), question) {
            (true, Some(q)) if !q.trim().is_empty() => Some(q),
            (true, _) => return Err(RequestValidationError::MissingQuestion),
            (false, None) => None,
            (false, Some(_)) => return Err(RequestValidationError::UnexpectedQuestion),
        };

        Ok(Self {
            text: trimmed.to_string(),
            operation,
            question,
            options,
            user_metadata,
        })
    }
}

/// A batch of jobs submitted together; fans out through the batch orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTextProcessingRequest {
    pub requests: Vec<TextProcessingRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum BatchValidationError {
    #[error("batch must contain at least {min} request(s), got {actual}")]
    TooFew { min: usize, actual: usize },
    #[error("batch must contain at most {max} requests, got {actual}")]
    TooMany { max: usize, actual: usize },
}

impl BatchTextProcessingRequest {
    pub fn validate_size(&self) -> Result<(), BatchValidationError> {
        let n = self.requests.len();
        if n < BATCH_MIN_LEN {
            return Err(BatchValidationError::TooFew { min: BATCH_MIN_LEN, actual: n });
        }
        if n > BATCH_MAX_LEN {
            return Err(BatchValidationError::TooMany { max: BATCH_MAX_LEN, actual: n });
        }
        Ok(())
    }
}
