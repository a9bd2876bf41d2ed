use async_trait::async_trait;

/// Generates the reply for one transcript window.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// `window` is oldest first and must hold at least one transcript.
    async fn build_response(&self, window: &[String]) -> Result<String, GenerationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("transcript window is empty")]
    EmptyWindow,
    #[error("chat completion request failed: {0}")]
    Request(String),
    #[error("chat completion api returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid chat completion response: {0}")]
    InvalidResponse(String),
}
