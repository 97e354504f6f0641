use crate::api::handlers::{health_check, index_document, index_stats, openapi, search};
use crate::config::ServiceConfig;
use crate::error::SearchError;
use crate::services::SearchServices;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;

/// Shared state handed to every handler
pub struct AppState {
    pub services: SearchServices,
    pub config: ServiceConfig,
}

impl AppState {
    pub fn new(services: SearchServices, config: ServiceConfig) -> Self {
        Self { services, config }
    }
}

/// Query string extraction failures answer with the JSON error body
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| SearchError::InvalidRequest(format!("Invalid query string: {}", err)).into())
}

/// Register the `/api/v1` routes
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .route("/search", web::get().to(search))
            .route("/index/{id}", web::put().to(index_document))
            .route("/stats", web::get().to(index_stats))
            .route("/openapi.json", web::get().to(openapi)),
    );
}

/// Start the API server
pub async fn start_server(config: ServiceConfig) -> Result<()> {
    let services = SearchServices::from_config(&config)?;
    let bind = (config.server.host.clone(), config.server.port);
    let state = web::Data::new(AppState::new(services, config));

    log::info!("Starting CommonQL Search API server on {}:{}", bind.0, bind.1);
    log::info!(
        "Write mode: {:?}, index: {}",
        state.config.write_mode,
        state
            .config
            .index
            .path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "in memory".to_string())
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(query_config())
            .configure(routes)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{ErrorResponse, HealthResponse, SearchResponse, StatsResponse};
    use crate::config::WriteMode;
    use crate::engine::store::DocumentStore;
    use actix_web::{http::StatusCode, test};
    use std::io::Write;

    const ID: &str = "00067360b70e4acfab561fe593ad3f7a";
    const PREFIX: &str = "http://localhost:8080/api/v1/retrieve/";

    fn state(write_mode: WriteMode) -> web::Data<AppState> {
        let mut config = ServiceConfig::default();
        config.write_mode = write_mode;
        config.limits.max_payload_bytes = 1024;
        let services = SearchServices::from_config(&config).unwrap();
        web::Data::new(AppState::new(services, config))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .app_data(query_config())
                    .configure(routes),
            )
            .await
        };
    }

    fn envelope_put(id: &str, body: &str) -> test::TestRequest {
        test::TestRequest::put()
            .uri(&format!("/api/v1/index/{}", id))
            .insert_header(("Accept-Version", "0.1.0"))
            .insert_header(("Content-Type", "application/json"))
            .set_payload(body.to_string())
    }

    #[actix_web::test]
    async fn test_health() {
        let state = state(WriteMode::Extraction);
        let app = app!(state);
        let response: HealthResponse =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
        assert_eq!(response.status, "healthy");
    }

    #[actix_web::test]
    async fn test_envelope_index_then_search() {
        let state = state(WriteMode::Envelope);
        let app = app!(state);

        let body = r#"{"ext.extracted.text": "All the color had been leached from Winterfell."}"#;
        let response = test::call_service(&app, envelope_put(ID, body).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let request = test::TestRequest::get()
            .uri("/api/v1/search?q=contents%20LIKE%20%27Winterfell%27")
            .to_request();
        let response: SearchResponse = test::call_and_read_body_json(&app, request).await;
        assert_eq!(response.results, vec![format!("{}{}", PREFIX, ID)]);
        assert_eq!(response.result_count, 1);

        let response = test::call_service(&app, envelope_put(ID, body).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.error_type, "DuplicateIdentity");
        assert_eq!(error.error, "Dataset already exists. Overwriting is not supported");
    }

    #[actix_web::test]
    async fn test_extraction_index() {
        let state = state(WriteMode::Extraction);
        let app = app!(state);

        let mut source = tempfile::NamedTempFile::new().unwrap();
        write!(source, "The North remembers").unwrap();
        let mut metadata = tempfile::NamedTempFile::new().unwrap();
        write!(metadata, "Stark").unwrap();
        let body = serde_json::json!({
            "sourceLocation": url::Url::from_file_path(source.path()).unwrap().to_string(),
            "metadataLocation": url::Url::from_file_path(metadata.path()).unwrap().to_string(),
            "mediaType": "text/plain",
        });

        let request = test::TestRequest::put()
            .uri(&format!("/api/v1/index/{}", ID))
            .insert_header(("Accept-Version", "0.1.0"))
            .set_json(&body)
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let record = state.services.store.find_by_id(ID).unwrap().unwrap();
        assert_eq!(record.title(), Some("Stark"));
        assert_eq!(record.contents(), Some("The North remembers"));
    }

    #[actix_web::test]
    async fn test_extraction_rejects_invalid_uri() {
        let state = state(WriteMode::Extraction);
        let app = app!(state);
        let request = test::TestRequest::put()
            .uri(&format!("/api/v1/index/{}", ID))
            .insert_header(("Accept-Version", "0.1.0"))
            .set_json(serde_json::json!({"sourceLocation": "not a uri", "metadataLocation": "file:///m"}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_query_errors_map_to_status() {
        let state = state(WriteMode::Extraction);
        let app = app!(state);

        let cases = [
            ("contents%20LIKE%20don%27t", StatusCode::BAD_REQUEST, "MalformedQuery"),
            ("thisIsNotAField%20%3D%20%27x%27", StatusCode::BAD_REQUEST, "IllegalQuery"),
            ("createdAt%20%3D%20%27soon%27", StatusCode::INTERNAL_SERVER_ERROR, "TranslationError"),
        ];
        for (query, status, error_type) in cases {
            let request = test::TestRequest::get().uri(&format!("/api/v1/search?q={}", query)).to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), status, "{}", query);
            let error: ErrorResponse = test::read_body_json(response).await;
            assert_eq!(error.error_type, error_type);
        }
    }

    #[actix_web::test]
    async fn test_query_length_limit() {
        let state = state(WriteMode::Extraction);
        let app = app!(state);
        let long = format!("title%20%3D%20%27{}%27", "a".repeat(5000));
        let request = test::TestRequest::get().uri(&format!("/api/v1/search?q={}", long)).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.error_type, "InvalidRequest");
    }

    #[actix_web::test]
    async fn test_missing_query_parameter() {
        let state = state(WriteMode::Extraction);
        let app = app!(state);
        for uri in ["/api/v1/search", "/api/v1/search?query=title"] {
            let response = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let error: ErrorResponse = test::read_body_json(response).await;
            assert_eq!(error.error_type, "InvalidRequest");
            assert!(error.error.contains("Invalid query string"));
        }
    }

    #[actix_web::test]
    async fn test_index_boundary_checks() {
        let state = state(WriteMode::Envelope);
        let app = app!(state);
        let body = r#"{"ext.extracted.text": "x"}"#;

        let response = test::call_service(&app, envelope_put("short", body).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = envelope_put(ID, body).insert_header(("Accept-Version", "9.9.9")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.error, "Not implemented");

        let request = envelope_put(ID, body).insert_header(("Content-Type", "text/plain")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let request = envelope_put(ID, &"x".repeat(2048)).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.error_type, "PayloadTooLarge");
        assert_eq!(error.error, "Payload is 2048 bytes; the limit is 1024 bytes");

        assert_eq!(state.services.store.count().unwrap(), 0);
    }

    #[actix_web::test]
    async fn test_stats_and_openapi() {
        let state = state(WriteMode::Envelope);
        let app = app!(state);
        let response: StatsResponse =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/v1/stats").to_request()).await;
        assert_eq!(response.total_docs, 0);
        assert_eq!(response.write_mode, "envelope");
        assert!(response.queryable_attributes.contains(&"contents".to_string()));

        let response: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/v1/openapi.json").to_request()).await;
        assert!(response["components"]["schemas"]["ErrorResponse"].is_object());
    }
}
