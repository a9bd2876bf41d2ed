//! Catch-all for 500 responses that did not come from [`AppError`].
//!
//! Extractor and framework errors render their own bodies, which may carry
//! internal detail. Every 500 leaving the service is rewritten to the same
//! opaque JSON body, and the original error is logged here unless `AppError`
//! already logged it.

use crate::error::AppError;
use actix_web::{
    dev::ServiceResponse,
    http::StatusCode,
    middleware::{ErrorHandlerResponse, ErrorHandlers},
    HttpResponse,
};
use serde_json::json;
use tracing::error;

pub struct OpaqueServerErrors;

impl OpaqueServerErrors {
    pub fn handlers<B: 'static>() -> ErrorHandlers<B> {
        ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, render_opaque)
    }
}

fn render_opaque<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    if let Some(err) = res.response().error() {
        if err.as_error::<AppError>().is_none() {
            error!(
                path = %res.request().path(),
                error = %err,
                "Unhandled request failure"
            );
        }
    }

    let (req, _) = res.into_parts();
    let response = HttpResponse::InternalServerError().json(json!({
        "error": "internal_server_error"
    }));
    let res = ServiceResponse::new(req, response).map_into_right_body();

    Ok(ErrorHandlerResponse::Response(res))
}
