use crate::api::models::{
    ApiDoc, ErrorResponse, HealthResponse, IndexRequestBody, SearchParams, SearchResponse, StatsResponse,
};
use crate::api::server::AppState;
use crate::api::validation::{
    validate_identity, validate_payload, validate_query, validate_version, ACCEPT_VERSION_HEADER,
};
use crate::config::WriteMode;
use crate::engine::store::DocumentStore;
use crate::error::SearchError;
use crate::index::IndexRequest;
use actix_web::{
    http::{header, StatusCode},
    web, HttpRequest, HttpResponse, ResponseError, Result,
};
use std::time::Instant;
use url::Url;
use utoipa::OpenApi;

impl ResponseError for SearchError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let kind = self.kind();
        if kind.is_client_error() {
            log::warn!("Rejected request: {}", self);
        } else {
            log::error!("{}: {}", self, self.detail().unwrap_or_default());
        }
        let detail = match kind.status_code() {
            400..=499 | 501 => self.detail(),
            _ => None,
        };
        HttpResponse::build(ResponseError::status_code(self)).json(ErrorResponse {
            error: self.to_string(),
            error_type: kind.as_str().to_string(),
            detail,
        })
    }
}

/// Health check endpoint
pub async fn health_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "CommonQL Search API".to_string(),
    }))
}

/// Search endpoint: `GET /search?q=<CommonQL>`
pub async fn search(state: web::Data<AppState>, params: web::Query<SearchParams>) -> Result<HttpResponse> {
    let query = params.into_inner().q;
    validate_query(&query, state.config.limits.max_query_length)?;

    let start_time = Instant::now();
    let worker = state.clone();
    let worker_query = query.clone();
    let locators = web::block(move || worker.services.queries.find(&worker_query)).await??;
    let duration = start_time.elapsed().as_secs_f32();

    let results: Vec<String> = locators.into_iter().map(String::from).collect();
    Ok(HttpResponse::Ok().json(SearchResponse {
        query,
        duration,
        result_count: results.len(),
        results,
    }))
}

/// Index endpoint: `PUT /index/{id}`, interpreted according to the configured write mode
pub async fn index_document(
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    validate_identity(&id)?;
    let version = request
        .headers()
        .get(ACCEPT_VERSION_HEADER)
        .and_then(|value| value.to_str().ok());
    validate_version(version, &state.config.index_api_version)?;
    let body = read_body(&request, payload, state.config.limits.max_payload_bytes).await?;

    let worker = state.clone();
    match state.config.write_mode {
        WriteMode::Extraction => {
            let index_request = parse_index_request(&body)?;
            web::block(move || worker.services.writer.index(&id, &index_request)).await??;
        }
        WriteMode::Envelope => {
            let content_type = request
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok());
            let media_type = validate_payload(content_type, body.len() as u64, state.config.limits.max_payload_bytes)?;
            web::block(move || worker.services.writer.index_envelope(&id, &media_type, body.as_ref())).await??;
        }
    }
    Ok(HttpResponse::Ok().finish())
}

/// Buffer the request body, refusing anything over `limit` bytes
async fn read_body(request: &HttpRequest, payload: web::Payload, limit: u64) -> Result<web::Bytes, SearchError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let too_large = |size: u64| SearchError::PayloadTooLarge { size, limit };
    if let Some(size) = declared.filter(|size| *size > limit) {
        return Err(too_large(size));
    }

    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    match payload.to_bytes_limited(max).await {
        Ok(Ok(body)) => Ok(body),
        Ok(Err(e)) => Err(SearchError::InvalidRequest(format!("Failed to read request body: {}", e))),
        Err(_) => Err(too_large(declared.unwrap_or(limit.saturating_add(1)))),
    }
}

fn parse_index_request(body: &[u8]) -> Result<IndexRequest, SearchError> {
    let body: IndexRequestBody = serde_json::from_slice(body)
        .map_err(|e| SearchError::InvalidRequest(format!("Invalid index request: {}", e)))?;
    let parse = |location: &str| {
        Url::parse(location).map_err(|_| SearchError::InvalidRequest(format!("Invalid URI syntax: {}", location)))
    };
    Ok(IndexRequest {
        source_location: parse(&body.source_location)?,
        metadata_location: parse(&body.metadata_location)?,
        media_type: body.media_type.filter(|media_type| !media_type.trim().is_empty()),
    })
}

/// Get index statistics
pub async fn index_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let worker = state.clone();
    let total_docs = web::block(move || worker.services.store.count())
        .await?
        .map_err(|source| SearchError::StoreUnavailable { context: "Unable to query index", source })?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        total_docs,
        read_only: state.services.store.is_read_only(),
        write_mode: match state.config.write_mode {
            WriteMode::Extraction => "extraction".to_string(),
            WriteMode::Envelope => "envelope".to_string(),
        },
        queryable_attributes: state.services.registry.queryable_attributes().iter().cloned().collect(),
    }))
}

/// OpenAPI document for the request and response models
pub async fn openapi() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiDoc::openapi()))
}
