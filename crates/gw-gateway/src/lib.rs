//! Composition root wiring resilience, cache, security, and the request
//! pipeline into a single AI request gateway facade. Analogous to the
//! teacher's top-level `tower-resilience` meta-crate: the constituent
//! crates stay independently usable, and this crate exists only to
//! assemble one coherent [`Gateway`] from process settings. See
//! SPEC_FULL.md §2.1.

mod config;
mod gateway;

pub use config::{resolve_cache_config, resolve_resilience_preset};
pub use gateway::Gateway;

// Re-exported so a binary depending only on `gw-gateway` can still reach
// the constituent crates' public types (settings, requests, provider trait)
// without adding five more direct dependencies.
pub use gw_cache as cache;
pub use gw_core as core;
pub use gw_observability as observability;
pub use gw_pipeline as pipeline;
pub use gw_resilience as resilience;
pub use gw_security as security;
