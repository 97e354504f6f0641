pub mod api;
pub mod compiler;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod index;
pub mod query;
pub mod services;

pub use api::start_server;
pub use compiler::parser::{Dialect, FilterParser};
pub use compiler::{ExecutableQuery, QueryTranslator};
pub use config::{ServiceConfig, WriteMode};
pub use data::DocumentRecord;
pub use engine::{DocumentStore, SchemaRegistry, TantivyStore};
pub use error::{ErrorKind, SearchError};
pub use index::{IndexRequest, IndexWriter};
pub use query::{LocatorStrategy, QueryService};
pub use services::SearchServices;
