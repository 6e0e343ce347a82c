use serde::Serialize;
use std::collections::BTreeMap;

/// Bad preset, missing required secret, or unknown cache/resilience name.
/// Fatal at startup; should never surface mid-request.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid configuration for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

/// The diagnostic context carried alongside every error's human-readable
/// message, rendered per SPEC_FULL.md §6 error body shape. Never holds
/// secrets.
pub type ErrorContext = BTreeMap<String, String>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub context: ErrorContext,
    /// Opaque correlation id for internal (500-class) errors only, per
    /// SPEC_FULL.md §7 ("internal 500s carry an opaque request_id for
    /// correlation"). Absent on 4xx/503, which are already self-explanatory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// The top-level error enum the request pipeline and HTTP surface render
/// from. Each crate-scoped error type composes into this one variant; this
/// is the single place request handling matches on error shape.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("validation error: {message}")]
    Validation { message: String, context: ErrorContext },

    #[error("authentication error: {message}")]
    Authentication { message: String, context: ErrorContext },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("upstream error after exhausting retries: {message}")]
    RetryExhausted {
        message: String,
        attempts: u32,
        context: ErrorContext,
    },

    #[error("circuit open for `{target}`, retry after {retry_after_secs}s")]
    CircuitOpen {
        target: String,
        retry_after_secs: u64,
        context: ErrorContext,
    },

    #[error("infrastructure error (degraded): {message}")]
    Infrastructure { message: String, context: ErrorContext },

    /// The upstream response failed §4.7 validation (forbidden content,
    /// leakage, refusal, or shape check). SPEC_FULL.md's general error
    /// taxonomy (§7) lumps this under `ValidationError`/400, but its worked
    /// scenario (§8 #4) is explicit that this case surfaces as 502 — the
    /// upstream produced the bad content, not the caller. Resolved here in
    /// favor of the concrete scenario; see DESIGN.md.
    #[error("upstream response rejected: {message}")]
    UpstreamResponseRejected { message: String, context: ErrorContext },
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation { message: message.into(), context: ErrorContext::new() }
    }

    pub fn validation_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        GatewayError::Validation { message: message.into(), context }
    }

    /// The representative HTTP status code for this error, per §6/§7.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Validation { .. } => 400,
            GatewayError::Authentication { .. } => 401,
            GatewayError::Configuration(_) => 500,
            GatewayError::RetryExhausted { .. } => 502,
            GatewayError::CircuitOpen { .. } => 503,
            GatewayError::Infrastructure { .. } => 500,
            GatewayError::UpstreamResponseRejected { .. } => 502,
        }
    }

    /// Whether this error class is ever eligible for retry by the calling
    /// pipeline. Validation, authentication, and configuration errors never
    /// are; circuit-open and retry-exhausted are terminal by construction
    /// (the resilience engine has already retried).
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn to_error_body(&self) -> ErrorBody {
        let context = match self {
            GatewayError::Validation { context, .. }
            | GatewayError::Authentication { context, .. }
            | GatewayError::RetryExhausted { context, .. }
            | GatewayError::CircuitOpen { context, .. }
            | GatewayError::Infrastructure { context, .. }
            | GatewayError::UpstreamResponseRejected { context, .. } => context.clone(),
            GatewayError::Configuration(_) => ErrorContext::new(),
        };
        let request_id = (self.status_code() == 500).then(|| uuid::Uuid::new_v4().to_string());
        ErrorBody { detail: ErrorDetail { message: self.to_string(), context, request_id } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(GatewayError::validation("bad").status_code(), 400);
        assert_eq!(
            GatewayError::Authentication { message: "no".into(), context: ErrorContext::new() }
                .status_code(),
            401
        );
        assert_eq!(
            GatewayError::CircuitOpen {
                target: "qa".into(),
                retry_after_secs: 5,
                context: ErrorContext::new()
            }
            .status_code(),
            503
        );
    }
}
