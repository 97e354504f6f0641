//! Query service: translate, execute, map hits to locators

use crate::compiler::QueryTranslator;
use crate::data::DocumentRecord;
use crate::engine::store::DocumentStore;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// How a matching record becomes a locator URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LocatorStrategy {
    /// `prefix` followed by the record identity
    RetrieveEndpoint { prefix: String },
    /// The URI stored in one of the record's attributes
    StoredAttribute { attribute: String },
}

impl Default for LocatorStrategy {
    fn default() -> Self {
        LocatorStrategy::RetrieveEndpoint { prefix: "http://localhost:8080/api/v1/retrieve/".to_string() }
    }
}

impl LocatorStrategy {
    pub fn locate(&self, record: &DocumentRecord) -> Result<Url> {
        let value = match self {
            LocatorStrategy::RetrieveEndpoint { prefix } => Some(format!("{}{}", prefix, record.id())),
            LocatorStrategy::StoredAttribute { attribute } => record.text_value(attribute).map(str::to_string),
        };
        match value {
            Some(value) => Url::parse(&value).map_err(|source| SearchError::CorruptRecord {
                id: record.id().to_string(),
                value: Some(value),
                source: Some(source),
            }),
            None => Err(SearchError::CorruptRecord { id: record.id().to_string(), value: None, source: None }),
        }
    }
}

pub struct QueryService {
    translator: Arc<QueryTranslator>,
    store: Arc<dyn DocumentStore>,
    locator: LocatorStrategy,
}

impl QueryService {
    pub fn new(translator: Arc<QueryTranslator>, store: Arc<dyn DocumentStore>, locator: LocatorStrategy) -> Self {
        Self { translator, store, locator }
    }

    /// Locators of every record matching `query`; no match is an empty set
    pub fn find(&self, query: &str) -> Result<BTreeSet<Url>> {
        log::debug!("received: {}", query);
        let executable = self.translator.translate(query)?;

        let hits = self
            .store
            .query(&executable)
            .map_err(|source| SearchError::QueryExecution { source })?;
        log::debug!("executed: {} hits", hits.len());

        let locators = hits
            .iter()
            .map(|record| self.locator.locate(record))
            .collect::<Result<BTreeSet<Url>>>()?;
        log::debug!("mapped: {} locators", locators.len());

        log::debug!("returned: {} locators for '{}'", locators.len(), query);
        Ok(locators)
    }
}
