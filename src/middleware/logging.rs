//! One structured log line per request.
//!
//! Only the method and path are recorded. Query strings and bodies (audio,
//! transcripts) never reach the log.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct RequestLogging;

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingMiddleware { service }))
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: S,
}

/// What is known about a request before it is handled.
struct RequestLine {
    method: String,
    path: String,
    remote_addr: String,
    started: Instant,
}

impl RequestLine {
    fn capture(req: &ServiceRequest) -> Self {
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        Self {
            method: req.method().to_string(),
            path: req.path().to_string(),
            remote_addr,
            started: Instant::now(),
        }
    }

    fn completed(&self, status: StatusCode) {
        let duration_ms = elapsed_ms(self.started.elapsed());
        let status = status.as_u16();

        if status >= 500 {
            warn!(
                method = %self.method,
                path = %self.path,
                remote_addr = %self.remote_addr,
                status,
                duration_ms,
                "Request completed with server error"
            );
        } else {
            info!(
                method = %self.method,
                path = %self.path,
                remote_addr = %self.remote_addr,
                status,
                duration_ms,
                "Request completed"
            );
        }
    }

    fn failed(&self, err: &Error) {
        error!(
            method = %self.method,
            path = %self.path,
            remote_addr = %self.remote_addr,
            duration_ms = elapsed_ms(self.started.elapsed()),
            error = %err,
            "Request failed"
        );
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let line = RequestLine::capture(&req);
        debug!(method = %line.method, path = %line.path, "Request started");

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            match &result {
                Ok(response) => line.completed(response.status()),
                Err(err) => line.failed(err),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    #[actix_web::test]
    async fn test_responses_pass_through_unchanged() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogging)
                .route("/ok", web::get().to(HttpResponse::Ok))
                .route("/boom", web::get().to(HttpResponse::ServiceUnavailable)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/ok?secret=1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/boom").to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[::core::prelude::v1::test]
    fn test_elapsed_ms_saturates() {
        assert_eq!(elapsed_ms(Duration::from_millis(42)), 42);
        assert_eq!(elapsed_ms(Duration::MAX), u64::MAX);
    }
}
