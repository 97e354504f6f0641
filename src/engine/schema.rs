//! Schema registry: the fixed, immutable set of indexable attributes.
//!
//! The registry is built once at start-up and shared by reference between the
//! query translator (validation) and the write pipeline (record assembly). It
//! also derives the tantivy schema, so the queryable names and the index fields
//! cannot drift apart.

use crate::engine::config::{AttributeConfig, AttributeType, SchemaConfig};
use crate::engine::constants::*;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tantivy::schema::{
    DateOptions, IndexRecordOption, Schema, SchemaBuilder, TextFieldIndexing, TextOptions,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("attribute '{0}' is declared more than once")]
    Duplicate(String),
    #[error("attribute '{0}' cannot be populated by the write pipeline")]
    Unknown(String),
    #[error("attribute '{0}' is missing from the registry")]
    Missing(String),
    #[error("attribute '{name}' must be declared as {expected:?}")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("the identity attribute must be a required string")]
    InvalidIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: String,
    pub attribute_type: AttributeType,
    pub queryable: bool,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    attributes: BTreeMap<String, AttributeSpec>,
    queryable: BTreeSet<String>,
    schema: Schema,
}

impl SchemaRegistry {
    /// Registry covering every record attribute, all queryable, only `id` required
    pub fn standard() -> Self {
        let specs = RECORD_ATTRIBUTES.iter().map(|name| AttributeSpec {
            name: name.to_string(),
            attribute_type: default_type(name),
            queryable: true,
            required: *name == ATTR_ID,
        });
        Self::build(specs.collect())
    }

    /// Build a registry from configuration, rejecting any drift from the record attributes
    pub fn from_config(config: SchemaConfig) -> std::result::Result<Self, RegistryError> {
        let mut seen = BTreeSet::new();
        let mut specs = Vec::with_capacity(config.attributes.len());

        for AttributeConfig { name, attribute_type, queryable, required } in config.attributes {
            if !RECORD_ATTRIBUTES.contains(&name.as_str()) {
                return Err(RegistryError::Unknown(name));
            }
            if !seen.insert(name.clone()) {
                return Err(RegistryError::Duplicate(name));
            }
            check_type(&name, attribute_type)?;
            if name == ATTR_ID && (!required || attribute_type != AttributeType::String) {
                return Err(RegistryError::InvalidIdentity);
            }
            specs.push(AttributeSpec { name, attribute_type, queryable, required });
        }

        if let Some(missing) = RECORD_ATTRIBUTES.iter().find(|name| !seen.contains(**name)) {
            return Err(RegistryError::Missing(missing.to_string()));
        }

        Ok(Self::build(specs))
    }

    /// Load a registry from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!("Schema file not found: {}", path.display()));
        }

        let yaml_str = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read schema file {}: {}", path.display(), e))?;

        let config: SchemaConfig = serde_yaml::from_str(&yaml_str)
            .map_err(|e| anyhow!("Invalid YAML schema in {}: {}", path.display(), e))?;

        let registry = Self::from_config(config)
            .map_err(|e| anyhow!("Invalid schema registry in {}: {}", path.display(), e))?;

        log::info!(
            "Schema registry loaded from {}: {} queryable attributes",
            path.display(),
            registry.queryable.len()
        );
        Ok(registry)
    }

    fn build(specs: Vec<AttributeSpec>) -> Self {
        let queryable = specs
            .iter()
            .filter(|spec| spec.queryable)
            .map(|spec| spec.name.clone())
            .collect();
        let schema = build_schema(&specs);
        let attributes = specs.into_iter().map(|spec| (spec.name.clone(), spec)).collect();
        Self { attributes, queryable, schema }
    }

    pub fn queryable_attributes(&self) -> &BTreeSet<String> {
        &self.queryable
    }

    pub fn is_queryable(&self, name: &str) -> bool {
        self.queryable.contains(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.values()
    }

    pub fn required_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .values()
            .filter(|spec| spec.required)
            .map(|spec| spec.name.as_str())
    }

    /// Names from `referenced` that are not queryable
    pub fn unsupported<'a, I>(&self, referenced: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        referenced
            .into_iter()
            .filter(|name| !self.queryable.contains(*name))
            .map(str::to_string)
            .collect()
    }

    pub fn tantivy_schema(&self) -> &Schema {
        &self.schema
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn default_type(name: &str) -> AttributeType {
    match name {
        ATTR_CONTENTS | ATTR_TITLE => AttributeType::Text,
        n if DATE_ATTRIBUTES.contains(&n) => AttributeType::Date,
        _ => AttributeType::String,
    }
}

/// Date attributes stay dates; everything else may be text or string.
fn check_type(name: &str, attribute_type: AttributeType) -> std::result::Result<(), RegistryError> {
    let is_date_attribute = DATE_ATTRIBUTES.contains(&name);
    match (is_date_attribute, attribute_type) {
        (true, AttributeType::Date) | (false, AttributeType::Text | AttributeType::String) => Ok(()),
        (true, _) => Err(RegistryError::TypeMismatch { name: name.to_string(), expected: "date" }),
        (false, _) => Err(RegistryError::TypeMismatch {
            name: name.to_string(),
            expected: "text or string",
        }),
    }
}

fn build_schema(specs: &[AttributeSpec]) -> Schema {
    let mut builder = Schema::builder();
    for spec in specs {
        match spec.attribute_type {
            AttributeType::Text => add_text_field(&mut builder, &spec.name),
            AttributeType::String => add_string_field(&mut builder, &spec.name),
            AttributeType::Date => add_date_field(&mut builder, &spec.name),
        }
    }
    builder.build()
}

fn add_text_field(builder: &mut SchemaBuilder, name: &str) {
    let indexing = TextFieldIndexing::default()
        .set_tokenizer("default")
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let options = TextOptions::default().set_indexing_options(indexing).set_stored();
    builder.add_text_field(name, options);
    log::debug!("Added text field '{}' with positions", name);
}

fn add_string_field(builder: &mut SchemaBuilder, name: &str) {
    let indexing = TextFieldIndexing::default()
        .set_tokenizer("raw")
        .set_index_option(IndexRecordOption::Basic);
    let options = TextOptions::default().set_indexing_options(indexing).set_stored();
    builder.add_text_field(name, options);
    log::debug!("Added string field '{}'", name);
}

fn add_date_field(builder: &mut SchemaBuilder, name: &str) {
    let options = DateOptions::default().set_indexed().set_stored().set_fast();
    builder.add_date_field(name, options);
    log::debug!("Added date field '{}'", name);
}
