//! # Application State Management
//!
//! Long-lived handles shared by every HTTP request handler: the configuration,
//! the session store, the transcript window manager and the two API clients.
//!
//! ## Lifecycle:
//! - **Startup**: [`AppState::initialize`] builds every client exactly once.
//! - **Requests**: Actix clones the state into each worker; every field is an
//!   `Arc` (or wraps one), so clones share the same underlying clients.
//! - **Shutdown**: [`AppState::shutdown`] runs after the server has drained.
//!
//! Nothing in here is mutated after startup, so no locks are needed. Tests build
//! the state with [`AppState::new`] and substitute their own implementations.

use crate::config::{AppConfig, StoreBackend};
use crate::response::{OpenAiChatGenerator, ResponseGenerator};
use crate::session::{
    InMemorySessionStore, RedisSessionStore, SessionStore, TranscriptWindow, WindowPolicy,
};
use crate::transcription::{OpenAiWhisperEngine, TranscriptionEngine};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Used directly only by the health check; window access goes through `window`
    pub store: Arc<dyn SessionStore>,

    pub window: TranscriptWindow,

    pub transcriber: Arc<dyn TranscriptionEngine>,

    pub responder: Arc<dyn ResponseGenerator>,

    /// When the server started (never changes)
    pub start_time: Instant,
}

impl AppState {
    /// Assemble state from already constructed collaborators.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        transcriber: Arc<dyn TranscriptionEngine>,
        responder: Arc<dyn ResponseGenerator>,
    ) -> Self {
        let window = TranscriptWindow::new(store.clone(), WindowPolicy::from_config(&config.store));
        Self {
            config: Arc::new(config),
            store,
            window,
            transcriber,
            responder,
            start_time: Instant::now(),
        }
    }

    /// Build the production collaborators described by `config`.
    ///
    /// A Redis server that is down at startup is not fatal: the failure is
    /// logged and the connection is attempted again on the first request.
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.openai.timeout())
            .build()
            .context("failed to build HTTP client")?;

        let transcriber = Arc::new(OpenAiWhisperEngine::new(http.clone(), &config.openai));
        let responder = Arc::new(OpenAiChatGenerator::new(http, &config.openai));

        let store: Arc<dyn SessionStore> = match config.store.backend {
            StoreBackend::Redis => {
                let redis = RedisSessionStore::new(&config.store.connection_url(), config.store.timeout())
                    .context("invalid Redis connection settings")?;
                match redis.connect().await {
                    Ok(()) => info!("Session store ready (redis)"),
                    Err(e) => warn!(error = %e, "Redis unreachable at startup, will retry on demand"),
                }
                Arc::new(redis)
            }
            StoreBackend::Memory => {
                warn!("Using in-memory session store; windows are lost on restart");
                Arc::new(InMemorySessionStore::new())
            }
        };

        Ok(Self::new(config, store, transcriber, responder))
    }

    /// Release the shared clients once the server has stopped.
    pub fn shutdown(self) {
        info!(
            uptime_seconds = self.get_uptime_seconds(),
            "Releasing session store and API clients"
        );
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
