//! # Transcription Module
//!
//! Speech-to-text for uploaded clips. Audio is never decoded or stored
//! locally: the bytes are forwarded in-memory to a hosted Whisper endpoint and
//! the returned text is used unmodified.
//!
//! ## Key Components:
//! - **TranscriptionEngine**: Trait the request handlers depend on
//! - **OpenAiWhisperEngine**: `POST /audio/transcriptions` implementation

pub mod engine;
pub mod openai;

pub use engine::{TranscriptionEngine, TranscriptionError};
pub use openai::OpenAiWhisperEngine;
