//! Schema registry configuration types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    pub attributes: Vec<AttributeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default = "default_queryable")]
    pub queryable: bool,
    #[serde(default)]
    pub required: bool,
}

/// Value type of an attribute, which also decides how it is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// Tokenized full text
    Text,
    /// Exact keyword
    String,
    Date,
}

fn default_queryable() -> bool {
    true
}
