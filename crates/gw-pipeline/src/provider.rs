use async_trait::async_trait;
use gw_core::Operation;
use gw_resilience::{Classify, FailureKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Failures a [`Provider`] may raise, classified for the resilience engine
/// per SPEC_FULL.md §4.1's transient/permanent/rate-limited taxonomy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("upstream network/timeout failure: {0}")]
    Transient(String),
    #[error("upstream rejected the request: {0}")]
    Permanent(String),
    #[error("upstream rate-limited the request")]
    RateLimited { retry_after: Option<Duration> },
    #[error("attempt exceeded its deadline")]
    TimedOut,
}

impl Classify for ProviderError {
    fn classify(&self) -> FailureKind {
        match self {
            ProviderError::Transient(_) | ProviderError::TimedOut => FailureKind::Transient,
            ProviderError::Permanent(_) => FailureKind::Permanent,
            ProviderError::RateLimited { retry_after } => {
                FailureKind::RateLimited { retry_after: *retry_after }
            }
        }
    }
}

impl From<gw_resilience::AttemptTimedOut> for ProviderError {
    fn from(_: gw_resilience::AttemptTimedOut) -> Self {
        ProviderError::TimedOut
    }
}

/// The pluggable upstream LLM call the resilience engine wraps. Real
/// provider integrations are external (§3.2); this crate ships two
/// deterministic test doubles.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn call(&self, prompt: &str, operation: Operation) -> Result<String, ProviderError>;
}

/// Deterministic in-memory provider: echoes a canned, shape-appropriate
/// response per operation without ever failing. Useful for exercising the
/// pipeline end-to-end without fault injection.
pub struct EchoProvider;

#[async_trait]
impl Provider for EchoProvider {
    async fn call(&self, prompt: &str, operation: Operation) -> Result<String, ProviderError> {
        let body = prompt.chars().take(60).collect::<String>();
        Ok(match operation {
            Operation::Summarize => format!("A concise summary of the provided text: {body}"),
            Operation::Qa => format!("Based on the provided text, the answer relates to: {body}"),
            Operation::Sentiment => {
                r#"{"sentiment":"neutral","confidence":0.6,"explanation":"no strong polarity detected"}"#
                    .to_string()
            }
            Operation::KeyPoints => "- first key point\n- second key point\n- third key point".to_string(),
            Operation::Questions => {
                "What is the main idea?\nWhat evidence supports it?\nWhat is left unresolved?".to_string()
            }
        })
    }
}

/// A scripted sequence of outcomes replayed in order, for fault-injection
/// tests (circuit breaker opening, retry exhaustion, timeouts). When the
/// script is exhausted, repeats the last entry so long-running tests don't
/// panic on an empty queue. Grounded in the teacher's chaos-layer test
/// doubles, simplified to an explicit script rather than a rate-based
/// injector since the pipeline's tests need reproducible sequences.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    last: Mutex<Option<ScriptedOutcome>>,
}

#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Success(String),
    Fail(ProviderError),
    /// Sleeps for the given duration before failing with `ProviderError::TimedOut`,
    /// for exercising the per-attempt timeout path deterministically.
    Delay(Duration),
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), last: Mutex::new(None) }
    }

    pub fn always_fail(err: ProviderError) -> Self {
        Self::new([ScriptedOutcome::Fail(err)])
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn call(&self, _prompt: &str, _operation: Operation) -> Result<String, ProviderError> {
        let next = {
            let mut script = self.script.lock();
            script.pop_front()
        };

        let outcome = match next {
            Some(outcome) => {
                *self.last.lock() = Some(outcome.clone());
                outcome
            }
            None => self.last.lock().clone().unwrap_or(ScriptedOutcome::Fail(ProviderError::Transient(
                "scripted provider exhausted with no prior outcome".to_string(),
            ))),
        };

        match outcome {
            ScriptedOutcome::Success(body) => Ok(body),
            ScriptedOutcome::Fail(err) => Err(err),
            ScriptedOutcome::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Err(ProviderError::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_provider_never_fails() {
        let provider = EchoProvider;
        for operation in Operation::ALL {
            assert!(provider.call("hello world", operation).await.is_ok());
        }
    }

    #[tokio::test]
    async fn scripted_provider_replays_in_order_then_repeats_last() {
        let provider = ScriptedProvider::new([
            ScriptedOutcome::Fail(ProviderError::Transient("boom".to_string())),
            ScriptedOutcome::Success("ok".to_string()),
        ]);
        assert!(provider.call("p", Operation::Qa).await.is_err());
        assert_eq!(provider.call("p", Operation::Qa).await.unwrap(), "ok");
        assert_eq!(provider.call("p", Operation::Qa).await.unwrap(), "ok");
    }
}
