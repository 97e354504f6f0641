//! CommonQL to tantivy translation.
//!
//! A query string is parsed by the dialect chain, checked against the
//! registry's queryable attributes and compiled into a tantivy query.

pub mod ast;
pub mod compiler;
pub mod parser;
pub mod pest_parser;

use crate::engine::schema::SchemaRegistry;
use crate::error::SearchError;
use ast::Filter;
use compiler::FilterCompiler;
use parser::{Dialect, FilterParser, ParsedFilter};
use std::fmt;
use std::sync::Arc;
use tantivy::query::Query;

/// A translated query, ready to run against the store
#[derive(Debug)]
pub struct ExecutableQuery {
    query: Box<dyn Query>,
    filter: Filter,
    dialect: Dialect,
}

impl ExecutableQuery {
    pub fn query(&self) -> &dyn Query {
        self.query.as_ref()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl fmt::Display for ExecutableQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.filter, self.dialect)
    }
}

pub struct QueryTranslator {
    parser: FilterParser,
    compiler: FilterCompiler,
    registry: Arc<SchemaRegistry>,
}

impl QueryTranslator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            parser: FilterParser::default(),
            compiler: FilterCompiler::new(registry.clone()),
            registry,
        }
    }

    /// Parse and validate without compiling
    pub fn validate(&self, query: &str) -> Result<ParsedFilter, SearchError> {
        let parsed = self.parser.parse(query)?;
        log::debug!("parsed ({}): {}", parsed.dialect, parsed.filter);

        let unsupported = self.registry.unsupported(parsed.filter.attributes());
        if !unsupported.is_empty() {
            return Err(SearchError::IllegalQuery { attributes: unsupported });
        }
        log::debug!("validated: {}", parsed.filter);
        Ok(parsed)
    }

    pub fn translate(&self, query: &str) -> Result<ExecutableQuery, SearchError> {
        let ParsedFilter { filter, dialect } = self.validate(query)?;
        let compiled = self
            .compiler
            .compile(&filter)
            .map_err(|e| SearchError::Translation { reason: e.to_string() })?;
        log::debug!("translated: {:?}", compiled);
        Ok(ExecutableQuery { query: compiled, filter, dialect })
    }
}
