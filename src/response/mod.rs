//! # Response Module
//!
//! Turns a session's transcript window into a short "emotional mirroring"
//! reply.
//!
//! ## Key Components:
//! - **PromptParts**: Splits the window into previous context and current vent
//! - **ResponseGenerator**: Trait the request handlers depend on
//! - **OpenAiChatGenerator**: `POST /chat/completions` implementation

pub mod generator;
pub mod openai;
pub mod prompt;

pub use generator::{GenerationError, ResponseGenerator};
pub use openai::OpenAiChatGenerator;
