//! # Session Module
//!
//! Per-session conversational state: identifiers, the store that holds each
//! session's transcript window, and the window manager that keeps it bounded.
//!
//! ## Session Lifecycle:
//! 1. **Created**: `POST /session` hands out a fresh identifier. Nothing is written.
//! 2. **Active**: The first audio upload creates the window list in the store.
//!    Every later upload appends to it and re-arms its TTL.
//! 3. **Expired**: With no uploads for a full TTL, the store drops the key.
//!
//! ## Key Components:
//! - **SessionId**: Opaque, client-unguessable token
//! - **SessionStore**: Trait over the list/TTL/type operations of the store
//! - **RedisSessionStore / InMemorySessionStore**: Store implementations
//! - **TranscriptWindow**: Append, trim, expire and read back a window

pub mod memory_store;
pub mod redis_store;
pub mod store;
pub mod window;

pub use memory_store::InMemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use store::{SessionStore, StoreError};
pub use window::{TranscriptWindow, WindowPolicy};

use crate::error::AppError;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Opaque session identifier.
///
/// Identifiers handed out by [`SessionId::generate`] are UUID v4 strings, but
/// client-supplied identifiers are only required to be non-empty. They are not
/// checked against any registry: an unknown identifier simply starts with an
/// empty window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a fresh session identifier. Performs no store write.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied identifier.
    pub fn parse(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AppError::InvalidInput("session_id must not be empty".to_string()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key holding this session's transcript window.
    pub fn store_key(&self) -> String {
        format!("session:{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_uuids() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_store_key_layout() {
        let id = SessionId::parse("abc-123").unwrap();
        assert_eq!(id.store_key(), "session:abc-123");
    }

    #[test]
    fn test_parse_rejects_blank_ids() {
        assert!(matches!(
            SessionId::parse("   "),
            Err(AppError::InvalidInput(_))
        ));
        // Non-UUID identifiers are accepted as-is
        assert!(SessionId::parse("not-a-uuid").is_ok());
    }
}
