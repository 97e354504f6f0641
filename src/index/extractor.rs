//! Plain-text extraction from byte streams

use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not read content stream")]
    Io(#[from] io::Error),
    #[error("content is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("media type '{0}' is not supported")]
    UnsupportedType(String),
    #[error("content exceeds the maximum length of {limit} characters")]
    TooLong { limit: usize },
}

/// What to do with text longer than the configured maximum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    #[default]
    Truncate,
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Maximum number of characters kept; absent means unlimited
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

/// Turns a byte stream into plain text
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, reader: &mut dyn Read, media_type: Option<&str>) -> Result<String, ExtractError>;
}

/// Extractor for textual media types
#[derive(Debug, Clone, Default)]
pub struct TextExtractor {
    config: ExtractorConfig,
}

const TEXTUAL_APPLICATION_TYPES: [&str; 2] = ["application/json", "application/xml"];

/// The media types `TextExtractor` accepts, as reported to callers
pub const TEXTUAL_MEDIA_TYPES: &str = "text/*, application/json or application/xml";

impl TextExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn with_max_length(max_length: usize, overflow: OverflowPolicy) -> Self {
        Self::new(ExtractorConfig { max_length: Some(max_length), overflow })
    }

    fn accepts(media_type: Option<&str>) -> bool {
        let Some(media_type) = media_type else {
            return true;
        };
        let essence = essence(media_type);
        essence.starts_with("text/") || TEXTUAL_APPLICATION_TYPES.contains(&essence.as_str())
    }

    fn bound(&self, text: String) -> Result<String, ExtractError> {
        let Some(limit) = self.config.max_length else {
            return Ok(text);
        };
        match text.char_indices().nth(limit) {
            None => Ok(text),
            Some((cut, _)) => match self.config.overflow {
                OverflowPolicy::Reject => Err(ExtractError::TooLong { limit }),
                OverflowPolicy::Truncate => {
                    log::debug!("Truncating extracted text to {} characters", limit);
                    let mut text = text;
                    text.truncate(cut);
                    Ok(text)
                }
            },
        }
    }
}

impl ContentExtractor for TextExtractor {
    fn extract(&self, reader: &mut dyn Read, media_type: Option<&str>) -> Result<String, ExtractError> {
        if !Self::accepts(media_type) {
            return Err(ExtractError::UnsupportedType(media_type.unwrap_or_default().to_string()));
        }
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let mut text = String::from_utf8(bytes)?;
        if text.starts_with('\u{feff}') {
            text.replace_range(..'\u{feff}'.len_utf8(), "");
        }
        self.bound(text)
    }
}

/// Media type without parameters, lower-cased: `Text/Plain; charset=utf-8` is `text/plain`
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
