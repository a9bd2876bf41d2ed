use async_trait::async_trait;

/// Converts one audio clip into text.
///
/// Implementations make a single attempt per call; callers decide what a
/// failure means for the request.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// `filename` is a hint for the container format (`clip.webm`, `note.m4a`).
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, TranscriptionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("transcription request failed: {0}")]
    Request(String),
    #[error("transcription api returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid transcription response: {0}")]
    InvalidResponse(String),
}
