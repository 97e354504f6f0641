//! Storage engine backed by Tantivy
//!
//! This module is organized into the following submodules:
//! - `constants`: Attribute names and boundary limits used across the codebase
//! - `config`: Registry configuration types (SchemaConfig, AttributeConfig)
//! - `schema`: The schema registry and the tantivy schema derived from it
//! - `store`: The DocumentStore capability and its error type
//! - `core`: Core TantivyStore struct and constructors
//! - `document`: Record conversion and conditional save/find/delete
//! - `execution`: Running translated queries

pub mod config;
pub mod constants;
pub mod core;
pub mod document;
pub mod execution;
pub mod schema;
pub mod store;

// Re-export main types for convenience
pub use config::{AttributeConfig, AttributeType, SchemaConfig};
pub use constants::*;
pub use core::TantivyStore;
pub use schema::{AttributeSpec, RegistryError, SchemaRegistry};
pub use store::{DocumentStore, StoreError};
