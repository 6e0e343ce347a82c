//! The request pipeline: sanitize -> build cache key -> assemble prompt ->
//! dispatch via the resilience engine -> validate -> cache, plus the
//! bounded-concurrency batch orchestrator that fans the same pipeline out
//! over multiple items. See SPEC_FULL.md §4.3, §4.4.

mod batch;
mod error;
mod pipeline;
mod prompt;
mod provider;

pub use batch::{process_batch, DEFAULT_BATCH_CONCURRENCY};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PROVIDER_TARGET};
pub use prompt::{assemble_prompt, AssembledPrompt};
pub use provider::{EchoProvider, Provider, ProviderError, ScriptedOutcome, ScriptedProvider};
