//! Core TantivyStore struct and constructors

use crate::engine::constants::*;
use crate::engine::schema::SchemaRegistry;
use crate::engine::store::StoreError;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tantivy::{
    directory::MmapDirectory,
    schema::{Field, Schema},
    Index, IndexReader, IndexWriter, ReloadPolicy,
};

/// Document store backed by a tantivy index
pub struct TantivyStore {
    pub(crate) index: Index,
    pub(crate) reader: IndexReader,
    pub(crate) writer: Option<Mutex<IndexWriter>>,
    pub(crate) registry: Arc<SchemaRegistry>,
    pub(crate) id_field: Field,
}

impl TantivyStore {
    /// Open (or create) an index directory with the registry's schema
    pub fn open(index_dir: &Path, registry: Arc<SchemaRegistry>, heap_bytes: usize) -> Result<Self, StoreError> {
        fs::create_dir_all(index_dir)?;
        let dir = MmapDirectory::open(index_dir).map_err(tantivy::TantivyError::from)?;
        let index = Index::open_or_create(dir, registry.tantivy_schema().clone())?;
        log::info!("Opened index at {}", index_dir.display());
        Self::from_index(index, registry, heap_bytes)
    }

    /// Index held entirely in memory
    pub fn in_memory(registry: Arc<SchemaRegistry>) -> Result<Self, StoreError> {
        let index = Index::create_in_ram(registry.tantivy_schema().clone());
        Self::from_index(index, registry, DEFAULT_WRITER_HEAP_BYTES)
    }

    fn from_index(index: Index, registry: Arc<SchemaRegistry>, heap_bytes: usize) -> Result<Self, StoreError> {
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = Self::try_create_writer(&index, heap_bytes)?.map(Mutex::new);
        let id_field = field(&index.schema(), ATTR_ID)?;

        Ok(Self {
            index,
            reader,
            writer,
            registry,
            id_field,
        })
    }

    fn try_create_writer(index: &Index, heap_bytes: usize) -> Result<Option<IndexWriter>, StoreError> {
        match index.writer_with_num_threads(1, heap_bytes) {
            Ok(w) => Ok(Some(w)),
            Err(tantivy::TantivyError::LockFailure(e, _)) => {
                log::warn!("Could not acquire index lock, running in READ-ONLY mode: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }

    pub fn schema(&self) -> Schema {
        self.index.schema()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn field(&self, name: &str) -> Result<Field, StoreError> {
        field(&self.index.schema(), name)
    }
}

fn field(schema: &Schema, name: &str) -> Result<Field, StoreError> {
    schema
        .get_field(name)
        .map_err(|_| StoreError::MissingField(name.to_string()))
}
