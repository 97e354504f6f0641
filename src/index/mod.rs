//! Index-write side: resource loading, text extraction and the write pipeline

pub mod extractor;
pub mod loader;
pub mod writer;

pub use extractor::{ContentExtractor, ExtractError, ExtractorConfig, OverflowPolicy, TextExtractor};
pub use loader::{DispatchingLoader, FileResourceLoader, HttpResourceLoader, ResourceLoader};
pub use writer::{IndexRequest, IndexWriter};
