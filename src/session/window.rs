//! # Transcript Window Manager
//!
//! Keeps each session's transcripts as a bounded, self-expiring list in the
//! session store.
//!
//! ## Invariants:
//! - A window never holds more than `max_entries` transcripts after a write;
//!   the oldest entries are dropped first.
//! - Every append re-arms the key's TTL to the full configured value, so a
//!   session lives as long as it keeps receiving audio.
//! - The key is always a list or absent. Anything else found under it is
//!   deleted before the append.
//!
//! The append, trim and expire steps are delegated to
//! [`SessionStore::push_bounded`] as one atomic group, so two uploads for the
//! same session cannot interleave. There is no in-process lock: several service
//! instances may share the same store.

use super::store::{SessionStore, StoreError, ValueType};
use super::SessionId;
use crate::config::StoreConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Size and lifetime limits applied to every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub max_entries: usize,
    pub ttl: Duration,
}

impl WindowPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            max_entries: config.window_size,
            ttl: config.session_ttl(),
        }
    }
}

#[derive(Clone)]
pub struct TranscriptWindow {
    store: Arc<dyn SessionStore>,
    policy: WindowPolicy,
}

impl TranscriptWindow {
    pub fn new(store: Arc<dyn SessionStore>, policy: WindowPolicy) -> Self {
        Self { store, policy }
    }

    /// Append `transcript` to the session's window and return the bounded
    /// window, oldest first.
    ///
    /// The transcript is stored as given, including an empty string. Store
    /// failures are returned as-is with no retry; an append that succeeded is
    /// not undone if a later step fails.
    pub async fn append_and_fetch(
        &self,
        session_id: &SessionId,
        transcript: &str,
    ) -> Result<Vec<String>, StoreError> {
        let key = session_id.store_key();

        if let ValueType::Other(kind) = self.store.value_type(&key).await? {
            warn!(
                session_id = %session_id,
                found_type = %kind,
                "Discarding non-list value stored under session key"
            );
            self.store.delete(&key).await?;
        }

        self.store
            .push_bounded(&key, transcript, self.policy.max_entries, self.policy.ttl)
            .await?;

        let window = self.store.range(&key).await?;
        debug!(
            session_id = %session_id,
            entries = window.len(),
            "Transcript window updated"
        );
        Ok(window)
    }
}
