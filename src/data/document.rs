use crate::engine::constants::*;
use crate::engine::schema::SchemaRegistry;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record identity must not be empty")]
    EmptyIdentity,
    #[error("unknown record attribute '{0}'")]
    UnknownAttribute(String),
    #[error("attribute '{0}' holds a {1} value")]
    WrongValueType(String, &'static str),
    #[error("record '{id}' is missing required attributes: {missing:?}")]
    MissingRequired { id: String, missing: Vec<String> },
}

/// Value of a single record attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue<'a> {
    Text(&'a str),
    Date(DateTime<Utc>),
}

/// The unit persisted in and retrieved from the document store.
///
/// Fields are private so the identity cannot change after construction; use
/// [`DocumentRecord::builder`] to create one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    id: String,
    contents: Option<String>,
    source_location: Option<String>,
    metadata_location: Option<String>,
    title: Option<String>,
    country_code: Option<String>,
    created_at: Option<DateTime<Utc>>,
    modified_at: Option<DateTime<Utc>>,
    media_type: Option<String>,
}

impl DocumentRecord {
    pub fn builder(id: impl Into<String>) -> DocumentRecordBuilder {
        DocumentRecordBuilder {
            record: DocumentRecord {
                id: id.into(),
                contents: None,
                source_location: None,
                metadata_location: None,
                title: None,
                country_code: None,
                created_at: None,
                modified_at: None,
                media_type: None,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    pub fn source_location(&self) -> Option<&str> {
        self.source_location.as_deref()
    }

    pub fn metadata_location(&self) -> Option<&str> {
        self.metadata_location.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Look up an attribute by its external name
    pub fn value(&self, attribute: &str) -> Option<AttributeValue<'_>> {
        match attribute {
            ATTR_ID => Some(AttributeValue::Text(&self.id)),
            ATTR_CONTENTS => text_of(&self.contents),
            ATTR_SOURCE_LOCATION => text_of(&self.source_location),
            ATTR_METADATA_LOCATION => text_of(&self.metadata_location),
            ATTR_TITLE => text_of(&self.title),
            ATTR_COUNTRY_CODE => text_of(&self.country_code),
            ATTR_MEDIA_TYPE => text_of(&self.media_type),
            ATTR_CREATED_AT => self.created_at.map(AttributeValue::Date),
            ATTR_MODIFIED_AT => self.modified_at.map(AttributeValue::Date),
            _ => None,
        }
    }

    /// Text value of an attribute, if it holds text
    pub fn text_value(&self, attribute: &str) -> Option<&str> {
        match self.value(attribute)? {
            AttributeValue::Text(text) => Some(text),
            AttributeValue::Date(_) => None,
        }
    }
}

fn text_of(value: &Option<String>) -> Option<AttributeValue<'_>> {
    value.as_deref().map(AttributeValue::Text)
}

#[derive(Debug, Clone)]
pub struct DocumentRecordBuilder {
    record: DocumentRecord,
}

impl DocumentRecordBuilder {
    pub fn contents(mut self, contents: impl Into<String>) -> Self {
        self.record.contents = Some(contents.into());
        self
    }

    pub fn source_location(mut self, location: &Url) -> Self {
        self.record.source_location = Some(location.to_string());
        self
    }

    pub fn metadata_location(mut self, location: &Url) -> Self {
        self.record.metadata_location = Some(location.to_string());
        self
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.record.title = title;
        self
    }

    pub fn country_code(mut self, country_code: impl Into<String>) -> Self {
        self.record.country_code = Some(country_code.into());
        self
    }

    pub fn media_type(mut self, media_type: Option<String>) -> Self {
        self.record.media_type = media_type;
        self
    }

    /// Stamp creation and modification time; sub-second precision is dropped
    /// because the index stores dates at second granularity.
    pub fn timestamps(mut self, at: DateTime<Utc>) -> Self {
        let at = at.trunc_subsecs(0);
        self.record.created_at = Some(at);
        self.record.modified_at = Some(at);
        self
    }

    /// Set a text attribute by its external name, as read back from the store.
    /// Location values are kept verbatim and only validated when read.
    pub fn text(mut self, attribute: &str, value: String) -> Result<Self, RecordError> {
        let slot = match attribute {
            ATTR_ID => {
                self.record.id = value;
                return Ok(self);
            }
            ATTR_CONTENTS => &mut self.record.contents,
            ATTR_SOURCE_LOCATION => &mut self.record.source_location,
            ATTR_METADATA_LOCATION => &mut self.record.metadata_location,
            ATTR_TITLE => &mut self.record.title,
            ATTR_COUNTRY_CODE => &mut self.record.country_code,
            ATTR_MEDIA_TYPE => &mut self.record.media_type,
            ATTR_CREATED_AT | ATTR_MODIFIED_AT => {
                return Err(RecordError::WrongValueType(attribute.to_string(), "text"))
            }
            other => return Err(RecordError::UnknownAttribute(other.to_string())),
        };
        *slot = Some(value);
        Ok(self)
    }

    pub fn date(mut self, attribute: &str, value: DateTime<Utc>) -> Result<Self, RecordError> {
        match attribute {
            ATTR_CREATED_AT => self.record.created_at = Some(value),
            ATTR_MODIFIED_AT => self.record.modified_at = Some(value),
            other if RECORD_ATTRIBUTES.contains(&other) => {
                return Err(RecordError::WrongValueType(other.to_string(), "date"))
            }
            other => return Err(RecordError::UnknownAttribute(other.to_string())),
        }
        Ok(self)
    }

    /// Finish the record, checking every attribute the registry marks as required
    pub fn build(self, registry: &SchemaRegistry) -> Result<DocumentRecord, RecordError> {
        let record = self.record;
        if record.id.trim().is_empty() {
            return Err(RecordError::EmptyIdentity);
        }

        let missing: Vec<String> = registry
            .required_attributes()
            .filter(|name| record.value(name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(RecordError::MissingRequired { id: record.id, missing });
        }

        Ok(record)
    }
}
