//! Boundary checks applied before a request reaches the services

use crate::engine::constants::IDENTITY_LENGTH;
use crate::error::SearchError;
use regex::Regex;
use std::sync::OnceLock;

pub const ACCEPT_VERSION_HEADER: &str = "Accept-Version";

fn identity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!("^[0-9A-Za-z]{{{}}}$", IDENTITY_LENGTH)).expect("Invalid identity pattern")
    })
}

pub fn validate_query(query: &str, max_length: usize) -> Result<(), SearchError> {
    let length = query.chars().count();
    if length > max_length {
        return Err(SearchError::InvalidRequest(format!(
            "Query string is {} characters; the limit is {}",
            length, max_length
        )));
    }
    Ok(())
}

pub fn validate_identity(id: &str) -> Result<(), SearchError> {
    if !identity_pattern().is_match(id) {
        return Err(SearchError::InvalidRequest(format!(
            "Identity must be {} alphanumeric characters",
            IDENTITY_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_version(requested: Option<&str>, supported: &str) -> Result<(), SearchError> {
    match requested {
        Some(version) if version == supported => Ok(()),
        other => Err(SearchError::UnsupportedVersion {
            requested: other.unwrap_or_default().to_string(),
            supported: supported.to_string(),
        }),
    }
}

/// Envelope payloads need a non-blank content type and must fit the size limit
pub fn validate_payload(content_type: Option<&str>, size: u64, limit: u64) -> Result<String, SearchError> {
    let content_type = content_type.map(str::trim).unwrap_or_default();
    if content_type.is_empty() {
        return Err(SearchError::InvalidRequest("Content-Type must not be blank".to_string()));
    }
    if size > limit {
        return Err(SearchError::PayloadTooLarge { size, limit });
    }
    Ok(content_type.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_query_length_counts_characters() {
        assert!(validate_query(&"a".repeat(5000), 5000).is_ok());
        assert!(validate_query(&"é".repeat(5000), 5000).is_ok());
        let err = validate_query(&"a".repeat(5001), 5000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.kind().status_code(), 400);
    }

    #[test]
    fn test_identity_pattern() {
        assert!(validate_identity("00067360b70e4acfab561fe593ad3f7a").is_ok());
        assert!(validate_identity("00067360B70E4ACFAB561FE593AD3F7A").is_ok());
        for id in [
            "",
            "00067360b70e4acfab561fe593ad3f7",
            "00067360b70e4acfab561fe593ad3f7a0",
            "00067360-70e4acfab561fe593ad3f7a",
            "00067360b70e4acfab561fe593ad3f7é",
        ] {
            assert!(validate_identity(id).is_err(), "{:?} should be rejected", id);
        }
    }

    #[test]
    fn test_version_must_match() {
        assert!(validate_version(Some("0.1.0"), "0.1.0").is_ok());
        let err = validate_version(Some("0.2.0"), "0.1.0").unwrap_err();
        assert_eq!(err.kind().status_code(), 501);
        assert_eq!(err.to_string(), "Not implemented");
        assert_eq!(
            err.detail().as_deref(),
            Some("Accept-Version was 0.2.0, but only 0.1.0 is currently supported.")
        );
        assert!(validate_version(None, "0.1.0").is_err());
    }

    #[test]
    fn test_payload_checks() {
        assert_eq!(validate_payload(Some(" application/json "), 10, 10).unwrap(), "application/json");
        assert_eq!(validate_payload(Some("  "), 1, 10).unwrap_err().kind(), ErrorKind::InvalidRequest);
        assert_eq!(validate_payload(None, 1, 10).unwrap_err().kind(), ErrorKind::InvalidRequest);
        let err = validate_payload(Some("application/json"), 11, 10).unwrap_err();
        assert_eq!(err.kind().status_code(), 413);
    }
}
