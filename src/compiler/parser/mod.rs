use crate::compiler::ast::Filter;
use crate::compiler::pest_parser::{build_filter, FilterGrammar, Rule};
use crate::error::SearchError;
use pest::Parser;
use std::fmt;

/// A CommonQL grammar dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// ECQL-like; reserves `id`, adds ILIKE, IN lists and literal-first comparisons
    Extended,
    /// CQL-like; accepts `id` as a plain attribute
    Classic,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Extended => "extended",
            Dialect::Classic => "classic",
        }
    }

    fn entry_rule(self) -> Rule {
        match self {
            Dialect::Extended => Rule::extended_filter,
            Dialect::Classic => Rule::classic_filter,
        }
    }

    /// Parse a whole query string in this dialect
    pub fn parse(self, query: &str) -> Result<Filter, String> {
        let mut pairs = FilterGrammar::parse(self.entry_rule(), query).map_err(|e| {
            let position = match e.line_col {
                pest::error::LineColLocation::Pos((line, col)) => format!("{}:{}", line, col),
                pest::error::LineColLocation::Span((line, col), _) => format!("{}:{}", line, col),
            };
            format!("syntax error at {}", position)
        })?;
        let root = pairs.next().ok_or_else(|| "empty parse result".to_string())?;
        build_filter(root)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A filter together with the dialect that accepted it
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFilter {
    pub filter: Filter,
    pub dialect: Dialect,
}

/// Ordered chain of dialect attempts; the first dialect that parses wins
#[derive(Debug, Clone)]
pub struct FilterParser {
    dialects: Vec<Dialect>,
}

impl Default for FilterParser {
    fn default() -> Self {
        Self::new(vec![Dialect::Extended, Dialect::Classic])
    }
}

impl FilterParser {
    pub fn new(dialects: Vec<Dialect>) -> Self {
        Self { dialects }
    }

    pub fn dialects(&self) -> &[Dialect] {
        &self.dialects
    }

    pub fn parse(&self, query: &str) -> Result<ParsedFilter, SearchError> {
        let mut details = Vec::with_capacity(self.dialects.len());
        for &dialect in &self.dialects {
            match dialect.parse(query) {
                Ok(filter) => return Ok(ParsedFilter { filter, dialect }),
                Err(reason) => {
                    log::debug!("{} dialect rejected query: {}", dialect, reason);
                    details.push(format!("{}: {}", dialect, reason));
                }
            }
        }
        Err(SearchError::MalformedQuery { details })
    }
}
