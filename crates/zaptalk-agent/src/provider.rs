use async_trait::async_trait;

/// Common interface for text-generation providers.
///
/// One prompt in, one completion out. Streaming, tool use and multi-turn
/// message arrays are out of scope; the pipeline carries history inside the
/// prompt itself.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Submit a prompt, wait for the full completion.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("parse error: {0}")]
    Parse(String),
}
