//! Document store capability consumed by the write pipeline and the query service

use crate::compiler::ExecutableQuery;
use crate::data::{DocumentRecord, RecordError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this identity is already stored; the save was refused.
    #[error("a record with id '{0}' already exists")]
    DuplicateKey(String),
    #[error("index is open in read-only mode")]
    ReadOnly,
    #[error("index writer lock is poisoned")]
    Poisoned,
    #[error("stored document is invalid: {0}")]
    InvalidDocument(#[from] RecordError),
    #[error("index schema has no field '{0}'")]
    MissingField(String),
    #[error(transparent)]
    Tantivy(#[from] tantivy::TantivyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Persistence and query execution over document records.
///
/// `save` is a conditional write: of two concurrent saves for the same identity
/// at most one succeeds, the other fails with [`StoreError::DuplicateKey`].
pub trait DocumentStore: Send + Sync {
    fn exists_by_id(&self, id: &str) -> Result<bool, StoreError>;

    fn save(&self, record: &DocumentRecord) -> Result<(), StoreError>;

    /// Matching records, in store order
    fn query(&self, query: &ExecutableQuery) -> Result<Vec<DocumentRecord>, StoreError>;

    fn find_by_id(&self, id: &str) -> Result<Option<DocumentRecord>, StoreError>;

    /// Remove one record; returns whether it existed
    fn delete_by_id(&self, id: &str) -> Result<bool, StoreError>;

    fn delete_all(&self) -> Result<(), StoreError>;

    fn count(&self) -> Result<u64, StoreError>;
}
