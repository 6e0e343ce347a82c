use std::collections::BTreeMap;

/// Errors raised while authenticating a request. See SPEC_FULL.md §4.5.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no credentials provided")]
    MissingCredentials,
    #[error("invalid API key")]
    InvalidKey,
}

impl AuthError {
    /// Whether the caller presented *some* credential that turned out to be
    /// wrong, vs. presenting none at all. Both render as 401, but the
    /// structured body's `credentials_provided` field (§4.5) differs.
    pub fn credentials_provided(&self) -> bool {
        matches!(self, AuthError::InvalidKey)
    }
}

/// Errors raised while validating an upstream response. See SPEC_FULL.md §4.7.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ResponseValidationError {
    #[error("response contains forbidden pattern `{pattern}`: matched `{matched}`")]
    ForbiddenPattern { pattern: String, matched: String },
    #[error("response leaks the system instruction verbatim")]
    SystemInstructionLeaked,
    #[error("response regurgitates the input text verbatim")]
    VerbatimRegurgitation,
    #[error("response looks like a refusal: `{matched}`")]
    Refusal { matched: String },
    #[error("response too short for operation `{operation}`: {actual} < {min}")]
    TooShort { operation: String, min: usize, actual: usize },
    #[error("response is empty")]
    Empty,
    #[error("response does not contain a `?` and is too short to be a question list")]
    MissingQuestionMark,
    #[error("response could not be parsed as a sentiment result: {reason}")]
    MalformedSentiment { reason: String },
}

impl ResponseValidationError {
    /// Diagnostic context suitable for `detail.context` in the structured
    /// error body (§6), never containing the full response body.
    pub fn context(&self) -> BTreeMap<String, String> {
        let mut ctx = BTreeMap::new();
        match self {
            ResponseValidationError::ForbiddenPattern { pattern, matched } => {
                ctx.insert("pattern".to_string(), pattern.clone());
                ctx.insert("matched".to_string(), matched.clone());
            }
            ResponseValidationError::Refusal { matched } => {
                ctx.insert("matched".to_string(), matched.clone());
            }
            ResponseValidationError::TooShort { operation, min, actual } => {
                ctx.insert("operation".to_string(), operation.clone());
                ctx.insert("min".to_string(), min.to_string());
                ctx.insert("actual".to_string(), actual.to_string());
            }
            _ => {}
        }
        ctx
    }
}
