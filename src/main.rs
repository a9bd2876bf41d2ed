//! # EchoSift Backend - Main Application Entry Point
//!
//! HTTP service that turns short voice recordings into empathetic reflections.
//! A client opens a session, uploads audio clips to it, and for each clip gets
//! back the transcript plus a reply that mirrors the emotional content of the
//! session's recent transcripts.
//!
//! ## Application Architecture:
//! - **config**: Layered configuration (defaults, `config.toml`, environment)
//! - **state**: Shared handles to the session store and the API clients
//! - **session**: Session identifiers and the bounded transcript window
//! - **transcription**: Speech-to-text collaborator
//! - **response**: Reply generation collaborator and its prompt
//! - **handlers** / **health**: HTTP endpoints
//! - **middleware**: Request logging, CORS and opaque 5xx bodies
//! - **error**: Request failure classification and HTTP mapping

mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod response;
mod session;
mod state;
mod transcription;

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ## Startup order:
/// 1. Load `.env`, start logging
/// 2. Load and validate configuration (a missing OpenAI key stops startup here)
/// 3. Build the shared state once
/// 4. Serve until SIGTERM/SIGINT, then drain and release the state
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting echosift-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        store = ?config.store.backend,
        window_size = config.store.window_size,
        session_ttl_seconds = config.store.session_ttl_seconds,
        openai_key_set = !config.openai.api_key.is_empty(),
        "Configuration loaded"
    );

    let app_state = AppState::initialize(config.clone()).await?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting HTTP server on {}", bind_addr);

    let server_state = app_state.clone();
    let cors_config = config.cors.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_state.clone()))
            // Last wrap is outermost
            .wrap(middleware::OpaqueServerErrors::handlers())
            .wrap(middleware::RequestLogging)
            .wrap(middleware::build_cors(&cors_config))
            .configure(handlers::configure_routes)
    })
    .bind(&bind_addr)?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    app_state.shutdown();
    info!("Server stopped gracefully");
    Ok(())
}

/// `RUST_LOG` overrides the default `echosift_backend=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echosift_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Resolve when SIGTERM or SIGINT arrives.
#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C");
}
