//! The index-write pipeline: uniqueness, metadata, extraction, assembly, save

use crate::data::DocumentRecord;
use crate::engine::constants::*;
use crate::engine::schema::SchemaRegistry;
use crate::engine::store::{DocumentStore, StoreError};
use crate::error::{Result, SearchError};
use crate::index::extractor::{essence, ContentExtractor, ExtractError, TEXTUAL_MEDIA_TYPES};
use crate::index::loader::ResourceLoader;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::Arc;
use url::Url;

/// Where to find a document's bytes and its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRequest {
    pub source_location: Url,
    pub metadata_location: Url,
    #[serde(default)]
    pub media_type: Option<String>,
}

pub struct IndexWriter {
    store: Arc<dyn DocumentStore>,
    loader: Arc<dyn ResourceLoader>,
    extractor: Arc<dyn ContentExtractor>,
    registry: Arc<SchemaRegistry>,
}

impl IndexWriter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        loader: Arc<dyn ResourceLoader>,
        extractor: Arc<dyn ContentExtractor>,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        Self { store, loader, extractor, registry }
    }

    /// Index the document behind `request` under `id`.
    ///
    /// Fails with `DuplicateIdentity` when the identity is already stored,
    /// including when a concurrent request wins the race to save it.
    pub fn index(&self, id: &str, request: &IndexRequest) -> Result<()> {
        self.ensure_unique(id)?;

        let title = self
            .loader
            .read_to_string(&request.metadata_location)
            .map_err(|source| SearchError::SourceUnreadable {
                location: request.metadata_location.to_string(),
                source,
            })?;
        let title = Some(title.trim().to_string()).filter(|title| !title.is_empty());

        let media_type = request
            .media_type
            .clone()
            .or_else(|| guess_media_type(&request.source_location));
        let contents = self.extract(&request.source_location, media_type.as_deref())?;

        let record = DocumentRecord::builder(id)
            .source_location(&request.source_location)
            .metadata_location(&request.metadata_location)
            .contents(contents)
            .title(title)
            .media_type(media_type)
            .timestamps(Utc::now())
            .build(&self.registry)
            .map_err(|e| SearchError::MalformedPayload { reason: format!("Invalid document record: {}", e) })?;

        self.save(&record)
    }

    /// Index a JSON envelope whose `ext.extracted.text` field holds the contents
    pub fn index_envelope(&self, id: &str, media_type: &str, payload: impl Read) -> Result<()> {
        if essence(media_type) != ENVELOPE_MEDIA_TYPE {
            return Err(SearchError::UnsupportedMediaType {
                expected: ENVELOPE_MEDIA_TYPE.to_string(),
                actual: media_type.to_string(),
            });
        }
        self.ensure_unique(id)?;

        let envelope: serde_json::Value = serde_json::from_reader(payload).map_err(|e| {
            SearchError::MalformedPayload { reason: format!("Unable to parse JSON payload: {}", e) }
        })?;
        let contents = match envelope.get(EXTRACTED_TEXT_FIELD) {
            None => {
                return Err(SearchError::MalformedPayload {
                    reason: format!(
                        "JSON is malformed because it does not have a {} field",
                        EXTRACTED_TEXT_FIELD
                    ),
                })
            }
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(_) => {
                return Err(SearchError::MalformedPayload {
                    reason: format!("JSON is malformed because the {} field is not a string", EXTRACTED_TEXT_FIELD),
                })
            }
        };

        let record = DocumentRecord::builder(id)
            .contents(contents)
            .media_type(Some(media_type.to_string()))
            .build(&self.registry)
            .map_err(|e| SearchError::MalformedPayload { reason: format!("Invalid document record: {}", e) })?;

        self.save(&record)
    }

    fn ensure_unique(&self, id: &str) -> Result<()> {
        let exists = self
            .store
            .exists_by_id(id)
            .map_err(|source| SearchError::StoreUnavailable { context: "Unable to query index", source })?;
        if exists {
            log::warn!("Refusing to overwrite datasetId={}", id);
            return Err(SearchError::DuplicateIdentity { id: id.to_string() });
        }
        Ok(())
    }

    fn extract(&self, location: &Url, media_type: Option<&str>) -> Result<String> {
        let failed = |source: ExtractError| SearchError::ExtractionFailed { location: location.to_string(), source };
        let mut stream = self.loader.open(location).map_err(|e| failed(e.into()))?;
        self.extractor.extract(stream.as_mut(), media_type).map_err(|source| match source {
            ExtractError::UnsupportedType(actual) => SearchError::UnsupportedMediaType {
                expected: TEXTUAL_MEDIA_TYPES.to_string(),
                actual,
            },
            source => failed(source),
        })
    }

    fn save(&self, record: &DocumentRecord) -> Result<()> {
        log::info!("Attempting to index datasetId={}", record.id());
        match self.store.save(record) {
            Ok(()) => {
                log::info!("Successfully indexed datasetId={}", record.id());
                Ok(())
            }
            Err(StoreError::DuplicateKey(id)) => {
                log::warn!("Concurrent index request already stored datasetId={}", id);
                Err(SearchError::DuplicateIdentity { id })
            }
            Err(source) => Err(SearchError::StoreUnavailable { context: "Unable to save index", source }),
        }
    }
}

fn guess_media_type(location: &Url) -> Option<String> {
    mime_guess::from_path(location.path())
        .first()
        .map(|mime| mime.essence_str().to_string())
}
