use crate::config::CorsConfig;
use actix_cors::Cors;

fn allows_any(values: &[String]) -> bool {
    values.iter().any(|value| value == "*")
}

/// Build the CORS middleware from configuration. `"*"` in a list means "any".
pub fn build_cors(config: &CorsConfig) -> Cors {
    let mut cors = Cors::default().max_age(config.max_age_seconds);

    cors = if allows_any(&config.allow_origins) {
        cors.allow_any_origin()
    } else {
        config
            .allow_origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin))
    };

    cors = if allows_any(&config.allow_methods) {
        cors.allow_any_method()
    } else {
        cors.allowed_methods(config.allow_methods.iter().map(String::as_str))
    };

    if allows_any(&config.allow_headers) {
        cors.allow_any_header()
    } else {
        cors.allowed_headers(config.allow_headers.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::header, test, web, App, HttpResponse};

    fn restricted() -> CorsConfig {
        CorsConfig {
            allow_origins: vec!["https://app.example".to_string()],
            allow_methods: vec!["GET".to_string(), "POST".to_string()],
            allow_headers: vec!["content-type".to_string()],
            max_age_seconds: 60,
        }
    }

    #[actix_web::test]
    async fn test_listed_origin_is_allowed() {
        let app = test::init_service(
            App::new()
                .wrap(build_cors(&restricted()))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://app.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example"
        );
    }

    #[actix_web::test]
    async fn test_unlisted_origin_gets_no_allow_header() {
        let app = test::init_service(
            App::new()
                .wrap(build_cors(&restricted()))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://evil.example"))
            .to_request();
        let resp = test::try_call_service(&app, req).await;

        // Depending on the request kind actix-cors either errors out or omits the header
        if let Ok(resp) = resp {
            assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        }
    }
}
