pub mod session;

pub use session::*;

use crate::health;
use actix_web::web;

/// Register every public route, both at the root and under `/api/v1`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/v1").configure(api_routes))
        .configure(api_routes);
}

fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/session", web::post().to(create_session))
        .route("/session/{session_id}/audio", web::post().to(process_audio));
}
