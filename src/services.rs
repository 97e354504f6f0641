//! Wiring of the registry, store, write pipeline and query service

use crate::compiler::QueryTranslator;
use crate::config::ServiceConfig;
use crate::engine::core::TantivyStore;
use crate::engine::schema::SchemaRegistry;
use crate::index::{DispatchingLoader, HttpResourceLoader, IndexWriter, TextExtractor};
use crate::query::QueryService;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Everything a request needs, shared between workers
pub struct SearchServices {
    pub registry: Arc<SchemaRegistry>,
    pub store: Arc<TantivyStore>,
    pub translator: Arc<QueryTranslator>,
    pub writer: IndexWriter,
    pub queries: QueryService,
}

impl SearchServices {
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let registry = Arc::new(match &config.schema_path {
            Some(path) => SchemaRegistry::from_yaml(path)?,
            None => SchemaRegistry::standard(),
        });

        let store = match &config.index.path {
            Some(path) => TantivyStore::open(path, registry.clone(), config.index.writer_heap_bytes)
                .with_context(|| format!("Failed to open index at {}", path.display()))?,
            None => {
                log::info!("No index path configured, using an in-memory index");
                TantivyStore::in_memory(registry.clone()).context("Failed to create in-memory index")?
            }
        };

        Ok(Self::new(registry, Arc::new(store), config))
    }

    pub fn new(registry: Arc<SchemaRegistry>, store: Arc<TantivyStore>, config: &ServiceConfig) -> Self {
        let translator = Arc::new(QueryTranslator::new(registry.clone()));
        let writer = IndexWriter::new(
            store.clone(),
            Arc::new(DispatchingLoader::new(HttpResourceLoader::with_timeout(config.loader.http_timeout()))),
            Arc::new(TextExtractor::new(config.extractor.clone())),
            registry.clone(),
        );
        let queries = QueryService::new(translator.clone(), store.clone(), config.locator.clone());
        Self { registry, store, translator, writer, queries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::store::DocumentStore;

    #[test]
    fn test_from_default_config_is_in_memory() {
        let services = SearchServices::from_config(&ServiceConfig::default()).unwrap();
        assert_eq!(services.store.count().unwrap(), 0);
        assert!(!services.store.is_read_only());
        assert!(services.registry.is_queryable("contents"));
    }

    #[test]
    fn test_from_config_with_index_path_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.yaml");
        std::fs::write(&schema, include_str!("../configs/schema.yaml")).unwrap();

        let mut config = ServiceConfig::default();
        config.index.path = Some(dir.path().join("index"));
        config.schema_path = Some(schema);
        let services = SearchServices::from_config(&config).unwrap();

        let payload = r#"{"ext.extracted.text": "Winterfell"}"#;
        services
            .writer
            .index_envelope("00067360b70e4acfab561fe593ad3f7a", "application/json", payload.as_bytes())
            .unwrap();
        assert_eq!(services.queries.find("contents LIKE 'winterfell'").unwrap().len(), 1);
        assert!(dir.path().join("index").join("meta.json").exists());
    }

    #[test]
    fn test_missing_schema_file_fails() {
        let mut config = ServiceConfig::default();
        config.schema_path = Some("/nonexistent/schema.yaml".into());
        assert!(SearchServices::from_config(&config).is_err());
    }
}
