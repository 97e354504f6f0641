use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

/// Query string parameters of the search endpoint
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchParams {
    /// CommonQL filter expression, URL-encoded
    #[schema(example = "contents LIKE 'Winterfell'")]
    pub q: String,
}

/// Response model for search results
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    /// The original query string
    #[schema(example = "contents LIKE 'Winterfell'")]
    pub query: String,
    /// Query execution duration in seconds
    #[schema(example = 0.023)]
    pub duration: f32,
    /// Number of locators returned
    #[schema(example = 1)]
    pub result_count: usize,
    /// Locators of the matching documents, sorted
    #[schema(example = json!(["http://localhost:8080/api/v1/retrieve/00067360b70e4acfab561fe593ad3f7a"]))]
    pub results: Vec<String>,
}

/// Body of an index request in extraction mode
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexRequestBody {
    /// Location of the document bytes
    #[schema(example = "file:///data/winterfell.txt")]
    pub source_location: String,
    /// Location of the metadata resource
    #[schema(example = "http://store:9041/metadata/00067360b70e4acfab561fe593ad3f7a")]
    pub metadata_location: String,
    /// Declared media type of the document; guessed from the source extension when absent
    #[schema(example = "text/plain")]
    #[serde(default)]
    pub media_type: Option<String>,
}

/// Error response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    #[schema(example = "Unsupported query attributes: {colour}")]
    pub error: String,
    /// Error type
    #[schema(example = "IllegalQuery")]
    pub error_type: String,
    /// Underlying cause, for client errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "healthy")]
    pub status: String,
    /// Service name
    #[schema(example = "CommonQL Search API")]
    pub service: String,
}

/// Index statistics response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Total number of documents in the index
    #[schema(example = 100)]
    pub total_docs: u64,
    /// Whether another process holds the index lock
    pub read_only: bool,
    /// How index requests are interpreted
    #[schema(example = "extraction")]
    pub write_mode: String,
    /// Attributes accepted in queries
    #[schema(example = json!(["contents", "countryCode", "id"]))]
    pub queryable_attributes: Vec<String>,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "CommonQL Search API"),
    components(schemas(
        SearchParams,
        SearchResponse,
        IndexRequestBody,
        ErrorResponse,
        HealthResponse,
        StatsResponse
    ))
)]
pub struct ApiDoc;
