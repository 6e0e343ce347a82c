/// Errors surfaced by the cache layer. Infrastructure failures (Redis
/// unreachable, encryption misconfigured) are always recoverable from the
/// caller's perspective: a cache miss is the correct fallback, never a
/// propagated failure of the surrounding request. See SPEC_FULL.md §4.2.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache infrastructure error: {0}")]
    Infrastructure(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache encryption error: {0}")]
    Encryption(String),

    #[error("cache is not connected")]
    NotConnected,

    #[error("invalid cache configuration: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Whether the caller should treat this as a plain miss rather than
    /// surface an error further up the stack. Configuration errors are the
    /// only variant that should fail loudly at startup.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CacheError::Configuration(_))
    }
}
