use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::error;

/// `GET /health`: pings the session store and nothing else.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "store": "connected",
            "timestamp": timestamp,
            "uptime_seconds": state.get_uptime_seconds(),
            "service": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }
        })),
        Err(e) => {
            error!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unavailable",
                "error": "store_unavailable",
                "timestamp": timestamp,
            }))
        }
    }
}
