use marketboard_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty roster, bad capacity, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Two roster entries share an external id.
    #[error("duplicate roster id: {0}")]
    DuplicateId(String),
}

/// Failure reported by the lookup collaborator. Always aborts the cycle.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed lookup response: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("lookup failed: {0}")]
    Source(#[from] SourceError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("cannot serialize state: {0}")]
    Encode(#[from] serde_json::Error),
}

impl EngineError {
    /// Registry and history are untouched after any of these; the caller may
    /// simply trigger another cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source(_) | Self::Store(_))
    }
}
