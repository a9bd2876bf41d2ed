//! # Configuration Management
//!
//! This module loads the service configuration once at startup from layered sources:
//! - Default values (built into the code)
//! - An optional `config.toml` file
//! - Environment variables prefixed with `APP__` (`__` separates sections)
//! - A short list of well-known unprefixed variables used by deployment platforms
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Well-known variables (`OPENAI_API_KEY`, `REDIS_URL`, `PORT`, ...)
//! 2. Prefixed variables (`APP__STORE__WINDOW_SIZE=30`, `APP__SERVER__PORT=3000`, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! The parsing itself is a pure function over a variable map ([`AppConfig::from_vars`]),
//! so the same code path is used by `main` and by the tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Unprefixed environment variables and the configuration key each one overrides.
const WELL_KNOWN_VARS: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("OPENAI_API_KEY", "openai.api_key"),
    ("REDIS_URL", "store.url"),
    ("REDIS_HOST", "store.host"),
    ("REDIS_PORT", "store.port"),
    ("REDIS_DB", "store.db"),
    ("REDIS_SESSION_TTL_SECONDS", "store.session_ttl_seconds"),
    ("WINDOW_SIZE", "store.window_size"),
];

/// Keys whose environment values are comma-separated lists.
const LIST_KEYS: &[&str] = &["cors.allow_origins", "cors.allow_methods", "cors.allow_headers"];

/// Main application configuration that contains all settings.
///
/// Each section maps to one concern of the service: the HTTP listener, the
/// OpenAI collaborators, the session window store, upload limits and CORS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub store: StoreConfig,
    pub upload: UploadConfig,
    pub cors: CorsConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (containers, production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings shared by the speech-to-text and chat completion clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Bearer token for both APIs. Never logged.
    pub api_key: String,
    pub base_url: String,
    pub transcription_model: String,
    pub chat_model: String,
    /// Sampling temperature for the mirroring reply
    pub temperature: f32,
    /// Upper bound on reply length, in tokens
    pub max_tokens: u32,
    /// Whole-request timeout applied to every collaborator call
    pub timeout_seconds: u64,
}

/// Which [`SessionStore`](crate::session::SessionStore) implementation backs the windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Session window store settings.
///
/// ## Connection:
/// `url` wins when present (hosted Redis usually hands out a single URL);
/// otherwise the URL is assembled from `host`, `port` and `db`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db: u32,
    /// Idle lifetime of a session window, re-armed on every append
    pub session_ttl_seconds: u64,
    /// Maximum number of transcripts kept per session
    pub window_size: usize,
    /// Bound on connecting to the store and on each command reply
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_audio_bytes: usize,
}

/// Cross-origin settings. A single `"*"` entry means "allow any".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub max_age_seconds: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            openai: OpenAiConfig {
                api_key: String::new(), // Must be supplied through the environment
                base_url: "https://api.openai.com/v1".to_string(),
                transcription_model: "whisper-1".to_string(),
                chat_model: "gpt-4o-mini".to_string(),
                temperature: 0.7,
                max_tokens: 250,
                timeout_seconds: 60,
            },
            store: StoreConfig {
                backend: StoreBackend::Redis,
                url: None,
                host: "redis".to_string(), // docker-compose service name
                port: 6379,
                db: 0,
                session_ttl_seconds: 600,
                window_size: 20,
                timeout_seconds: 5,
            },
            upload: UploadConfig {
                max_audio_bytes: 25 * 1024 * 1024, // speech-to-text API upload limit
            },
            cors: CorsConfig {
                allow_origins: vec!["*".to_string()],
                allow_methods: vec!["*".to_string()],
                allow_headers: vec!["*".to_string()],
                max_age_seconds: 3600,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment and `config.toml`.
    pub fn load() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::build(&vars, Some("config"))
    }

    /// Build configuration from defaults plus the given variable map only.
    ///
    /// No file or process state is consulted, which keeps this deterministic.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        Self::build(vars, None)
    }

    fn build(vars: &HashMap<String, String>, file: Option<&str>) -> Result<Self> {
        let mut environment = config::Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .source(Some(vars.clone()));
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }

        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(name) = file {
            settings = settings.add_source(config::File::with_name(name).required(false));
        }

        settings = settings.add_source(environment);

        for (var, key) in WELL_KNOWN_VARS {
            if let Some(value) = vars.get(*var) {
                settings = settings.set_override(*key, value.as_str())?;
            }
        }

        if let Some(origins) = vars.get("CORS_ALLOW_ORIGINS") {
            settings = settings.set_override("cors.allow_origins", split_list(origins))?;
        }

        let config = settings
            .build()?
            .try_deserialize()
            .context("failed to deserialize application configuration")?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.openai.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "OpenAI API key is missing (set OPENAI_API_KEY)"
            ));
        }

        if self.store.window_size == 0 {
            return Err(anyhow::anyhow!("Window size must be greater than 0"));
        }

        if self.store.session_ttl_seconds == 0 {
            return Err(anyhow::anyhow!("Session TTL must be greater than 0"));
        }

        if self.store.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Store timeout must be greater than 0"));
        }

        if self.upload.max_audio_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum audio size must be greater than 0"));
        }

        if self.cors.allow_origins.is_empty() {
            return Err(anyhow::anyhow!("At least one CORS origin must be configured"));
        }

        Ok(())
    }
}

impl StoreConfig {
    /// Connection URL for the Redis client.
    pub fn connection_url(&self) -> String {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.window_size, 20);
        assert_eq!(config.store.session_ttl_seconds, 600);
        assert_eq!(config.openai.chat_model, "gpt-4o-mini");
        // No API key by default, so validation must fail
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_vars_reads_api_key() {
        let config = AppConfig::from_vars(&vars(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.openai.api_key, "sk-test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prefixed_variables_override_defaults() {
        let config = AppConfig::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("APP__STORE__WINDOW_SIZE", "5"),
            ("APP__STORE__SESSION_TTL_SECONDS", "90"),
            ("APP__SERVER__PORT", "9000"),
            ("APP__STORE__BACKEND", "memory"),
        ]))
        .unwrap();

        assert_eq!(config.store.window_size, 5);
        assert_eq!(config.store.session_ttl(), Duration::from_secs(90));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_well_known_variables_win() {
        let config = AppConfig::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("APP__SERVER__PORT", "9000"),
            ("PORT", "3000"),
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("REDIS_DB", "2"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.store.connection_url(), "redis://cache.internal:6380/2");
    }

    #[test]
    fn test_redis_url_takes_precedence_over_host() {
        let config = AppConfig::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("REDIS_URL", "redis://:secret@redis.example.com:6379/0"),
            ("REDIS_HOST", "ignored"),
        ]))
        .unwrap();

        assert_eq!(
            config.store.connection_url(),
            "redis://:secret@redis.example.com:6379/0"
        );
    }

    #[test]
    fn test_cors_origins_are_split() {
        let config = AppConfig::from_vars(&vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CORS_ALLOW_ORIGINS", "https://a.example, https://b.example,"),
        ]))
        .unwrap();

        assert_eq!(
            config.cors.allow_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::from_vars(&vars(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        config.store.window_size = 0;
        assert!(config.validate().is_err());

        config.store.window_size = 20;
        config.store.session_ttl_seconds = 0;
        assert!(config.validate().is_err());

        config.store.session_ttl_seconds = 600;
        config.server.port = 0;
        assert!(config.validate().is_err());
    }
}
