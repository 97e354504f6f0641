//! Attribute names and boundary limits for consistency across the codebase

pub const ATTR_ID: &str = "id";
pub const ATTR_CONTENTS: &str = "contents";
pub const ATTR_SOURCE_LOCATION: &str = "sourceLocation";
pub const ATTR_METADATA_LOCATION: &str = "metadataLocation";
pub const ATTR_TITLE: &str = "title";
pub const ATTR_COUNTRY_CODE: &str = "countryCode";
pub const ATTR_CREATED_AT: &str = "createdAt";
pub const ATTR_MODIFIED_AT: &str = "modifiedAt";
pub const ATTR_MEDIA_TYPE: &str = "mediaType";

/// Every attribute a document record can carry
pub const RECORD_ATTRIBUTES: [&str; 9] = [
    ATTR_ID,
    ATTR_CONTENTS,
    ATTR_SOURCE_LOCATION,
    ATTR_METADATA_LOCATION,
    ATTR_TITLE,
    ATTR_COUNTRY_CODE,
    ATTR_CREATED_AT,
    ATTR_MODIFIED_AT,
    ATTR_MEDIA_TYPE,
];

/// Attributes holding timestamps
pub const DATE_ATTRIBUTES: [&str; 2] = [ATTR_CREATED_AT, ATTR_MODIFIED_AT];

/// Envelope payload field carrying pre-extracted text
pub const EXTRACTED_TEXT_FIELD: &str = "ext.extracted.text";
pub const ENVELOPE_MEDIA_TYPE: &str = "application/json";

pub const DEFAULT_MAX_QUERY_LENGTH: usize = 5000;
pub const IDENTITY_LENGTH: usize = 32;
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 10 * (1 << 30);
pub const DEFAULT_WRITER_HEAP_BYTES: usize = 50_000_000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
