pub mod document;

pub use document::{AttributeValue, DocumentRecord, DocumentRecordBuilder, RecordError};
