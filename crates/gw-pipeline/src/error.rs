use gw_core::{ErrorContext, GatewayError, RequestValidationError};
use gw_resilience::ResilienceError;
use gw_security::{AuthError, ResponseValidationError};

/// Errors raised while running a single request through the pipeline.
/// Composes every crate-scoped error the pipeline touches; never holds a
/// [`GatewayError`] itself, since the conversion to that shape is the last
/// step before a response is rendered. See SPEC_FULL.md §7.1.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("request validation failed: {0}")]
    Request(#[from] RequestValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    ResponseValidation(#[from] ResponseValidationError),

    #[error("upstream call failed: {0}")]
    Resilience(ResilienceError<crate::provider::ProviderError>),
}

impl From<ResilienceError<crate::provider::ProviderError>> for PipelineError {
    fn from(err: ResilienceError<crate::provider::ProviderError>) -> Self {
        PipelineError::Resilience(err)
    }
}

impl From<PipelineError> for GatewayError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Request(e) => GatewayError::validation(e.to_string()),
            PipelineError::Auth(e) => GatewayError::Authentication {
                message: e.to_string(),
                context: ErrorContext::new(),
            },
            PipelineError::ResponseValidation(e) => {
                let mut context = e.context();
                context.insert("stage".to_string(), "response_validation".to_string());
                GatewayError::UpstreamResponseRejected { message: e.to_string(), context }
            }
            PipelineError::Resilience(ResilienceError::CircuitOpen { target, retry_at }) => {
                let retry_after_secs = retry_at.saturating_duration_since(std::time::Instant::now()).as_secs();
                GatewayError::CircuitOpen { target, retry_after_secs, context: ErrorContext::new() }
            }
            PipelineError::Resilience(ResilienceError::RetryExhausted { cause, attempts }) => {
                GatewayError::RetryExhausted {
                    message: cause.to_string(),
                    attempts,
                    context: ErrorContext::new(),
                }
            }
            PipelineError::Resilience(ResilienceError::Permanent(cause)) => {
                GatewayError::Infrastructure { message: cause.to_string(), context: ErrorContext::new() }
            }
        }
    }
}
