//! Error taxonomy shared by the translator, the write pipeline and the query service.
//!
//! Every failure carries an [`ErrorKind`] with a fixed status code. The error
//! that caused it stays reachable through `source()` so callers see the detail.

use crate::engine::store::StoreError;
use crate::index::extractor::ExtractError;
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedQuery,
    IllegalQuery,
    TranslationError,
    DuplicateIdentity,
    StoreUnavailable,
    SourceUnreadable,
    ExtractionFailed,
    MalformedPayload,
    UnsupportedMediaType,
    QueryExecutionFailed,
    CorruptRecord,
    InvalidRequest,
    PayloadTooLarge,
    UnsupportedVersion,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::MalformedQuery
            | ErrorKind::IllegalQuery
            | ErrorKind::DuplicateIdentity
            | ErrorKind::SourceUnreadable
            | ErrorKind::MalformedPayload
            | ErrorKind::InvalidRequest => 400,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::UnsupportedMediaType => 415,
            ErrorKind::UnsupportedVersion => 501,
            ErrorKind::TranslationError
            | ErrorKind::StoreUnavailable
            | ErrorKind::ExtractionFailed
            | ErrorKind::QueryExecutionFailed
            | ErrorKind::CorruptRecord => 500,
        }
    }

    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MalformedQuery => "MalformedQuery",
            ErrorKind::IllegalQuery => "IllegalQuery",
            ErrorKind::TranslationError => "TranslationError",
            ErrorKind::DuplicateIdentity => "DuplicateIdentity",
            ErrorKind::StoreUnavailable => "StoreUnavailable",
            ErrorKind::SourceUnreadable => "SourceUnreadable",
            ErrorKind::ExtractionFailed => "ExtractionFailed",
            ErrorKind::MalformedPayload => "MalformedPayload",
            ErrorKind::UnsupportedMediaType => "UnsupportedMediaType",
            ErrorKind::QueryExecutionFailed => "QueryExecutionFailed",
            ErrorKind::CorruptRecord => "CorruptRecord",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::UnsupportedVersion => "UnsupportedVersion",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// Neither dialect could parse the query; `details` holds one entry per dialect.
    #[error("Invalid CommonQL query string")]
    MalformedQuery { details: Vec<String> },

    #[error("Unsupported query attributes: {{{}}}", join_names(.attributes))]
    IllegalQuery { attributes: BTreeSet<String> },

    #[error("Error processing CQL: {reason}")]
    Translation { reason: String },

    #[error("Dataset already exists. Overwriting is not supported")]
    DuplicateIdentity { id: String },

    #[error("{context}")]
    StoreUnavailable {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Could not read metadata body from {location}")]
    SourceUnreadable {
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to extract content from {location}")]
    ExtractionFailed {
        location: String,
        #[source]
        source: ExtractError,
    },

    #[error("{reason}")]
    MalformedPayload { reason: String },

    #[error("Unsupported media type '{actual}'; expected {expected}")]
    UnsupportedMediaType { expected: String, actual: String },

    #[error("Error querying index")]
    QueryExecution {
        #[source]
        source: StoreError,
    },

    #[error("Invalid locator stored for {id}: {value:?}")]
    CorruptRecord {
        id: String,
        value: Option<String>,
        #[source]
        source: Option<url::ParseError>,
    },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Payload is {size} bytes; the limit is {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Not implemented")]
    UnsupportedVersion { requested: String, supported: String },
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::MalformedQuery { .. } => ErrorKind::MalformedQuery,
            SearchError::IllegalQuery { .. } => ErrorKind::IllegalQuery,
            SearchError::Translation { .. } => ErrorKind::TranslationError,
            SearchError::DuplicateIdentity { .. } => ErrorKind::DuplicateIdentity,
            SearchError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            SearchError::SourceUnreadable { .. } => ErrorKind::SourceUnreadable,
            SearchError::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            SearchError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            SearchError::UnsupportedMediaType { .. } => ErrorKind::UnsupportedMediaType,
            SearchError::QueryExecution { .. } => ErrorKind::QueryExecutionFailed,
            SearchError::CorruptRecord { .. } => ErrorKind::CorruptRecord,
            SearchError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            SearchError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            SearchError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
        }
    }

    /// Detail text for the caller: the source chain, the per-dialect parse
    /// failures of a malformed query, or the supported API version.
    pub fn detail(&self) -> Option<String> {
        match self {
            SearchError::MalformedQuery { details } => {
                return (!details.is_empty()).then(|| details.join("; "));
            }
            SearchError::UnsupportedVersion { requested, supported } => {
                return Some(format!(
                    "Accept-Version was {}, but only {} is currently supported.",
                    requested, supported
                ));
            }
            _ => {}
        }
        let mut causes = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        (!causes.is_empty()).then(|| causes.join(": "))
    }
}

fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_query_lists_every_attribute() {
        let attributes: BTreeSet<String> = ["b", "a"].iter().map(|s| s.to_string()).collect();
        let err = SearchError::IllegalQuery { attributes };
        assert_eq!(err.to_string(), "Unsupported query attributes: {a, b}");
        assert_eq!(err.kind(), ErrorKind::IllegalQuery);
        assert_eq!(err.kind().status_code(), 400);
    }

    #[test]
    fn test_status_codes_split_client_and_server() {
        assert!(ErrorKind::MalformedQuery.is_client_error());
        assert!(ErrorKind::DuplicateIdentity.is_client_error());
        assert!(ErrorKind::UnsupportedMediaType.is_client_error());
        assert!(!ErrorKind::TranslationError.is_client_error());
        assert!(!ErrorKind::CorruptRecord.is_client_error());
        assert_eq!(ErrorKind::UnsupportedVersion.status_code(), 501);
    }

    #[test]
    fn test_detail_walks_source_chain() {
        let err = SearchError::StoreUnavailable {
            context: "Unable to save index",
            source: StoreError::ReadOnly,
        };
        assert_eq!(err.to_string(), "Unable to save index");
        assert_eq!(err.detail().as_deref(), Some("index is open in read-only mode"));
    }

    #[test]
    fn test_malformed_query_detail_joins_dialects() {
        let err = SearchError::MalformedQuery {
            details: vec!["extended: a".to_string(), "classic: b".to_string()],
        };
        assert_eq!(err.to_string(), "Invalid CommonQL query string");
        assert_eq!(err.detail().as_deref(), Some("extended: a; classic: b"));
    }
}
