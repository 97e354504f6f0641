use crate::compiler::ast::{Comparison, Filter, Literal};
use crate::engine::config::AttributeType;
use crate::engine::schema::SchemaRegistry;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::ops::Bound;
use std::sync::Arc;
use tantivy::{
    query::{AllQuery, BooleanQuery, EmptyQuery, Occur, PhraseQuery, Query, RangeQuery, RegexQuery, TermQuery},
    schema::{Field, FieldType, IndexRecordOption, Term},
    tokenizer::{TextAnalyzer, Token, TokenStream, TokenizerManager},
};

/// Compiles a validated filter into a tantivy query over the registry's schema
pub struct FilterCompiler {
    registry: Arc<SchemaRegistry>,
    tokenizers: TokenizerManager,
}

/// A query value after analysis: a term at its analyzer position, or a
/// regex built from terms joined by `%`
#[derive(Debug, Clone, PartialEq)]
enum PatternToken {
    Plain { text: String, position: usize },
    Wildcard(String),
}

impl FilterCompiler {
    /// Text values are analyzed with the tokenizers a tantivy index registers by default
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_tokenizers(registry, TokenizerManager::default())
    }

    pub fn with_tokenizers(registry: Arc<SchemaRegistry>, tokenizers: TokenizerManager) -> Self {
        Self { registry, tokenizers }
    }

    pub fn compile(&self, filter: &Filter) -> Result<Box<dyn Query>> {
        match filter {
            Filter::Include => Ok(Box::new(AllQuery)),
            Filter::Exclude => Ok(Box::new(EmptyQuery)),
            Filter::And(children) => self.compile_connective(children, Occur::Must),
            Filter::Or(children) => self.compile_connective(children, Occur::Should),
            Filter::Not(inner) => Ok(negate(self.compile(inner)?)),
            Filter::Compare { attribute, op, value } => self.compile_comparison(attribute, *op, value),
            Filter::Like { attribute, pattern, case_insensitive } => {
                self.compile_like(attribute, pattern, *case_insensitive)
            }
            Filter::In { attribute, values } => {
                let clauses = values
                    .iter()
                    .map(|value| Ok((Occur::Should, self.compile_equality(attribute, value)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(BooleanQuery::new(clauses)))
            }
            Filter::Between { attribute, lower, upper } => {
                self.compile_range(attribute, Bound::Included(lower), Bound::Included(upper))
            }
            Filter::IsNull { attribute } => Ok(negate(self.compile_not_null(attribute)?)),
            Filter::Before { attribute, instant } => {
                self.compile_date_range(attribute, Bound::Unbounded, Bound::Excluded(*instant))
            }
            Filter::After { attribute, instant } => {
                self.compile_date_range(attribute, Bound::Excluded(*instant), Bound::Unbounded)
            }
            Filter::During { attribute, start, end } => {
                self.compile_date_range(attribute, Bound::Excluded(*start), Bound::Excluded(*end))
            }
        }
    }

    fn compile_connective(&self, children: &[Filter], occur: Occur) -> Result<Box<dyn Query>> {
        let clauses = children
            .iter()
            .map(|child| Ok((occur, self.compile(child)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    fn compile_comparison(&self, attribute: &str, op: Comparison, value: &Literal) -> Result<Box<dyn Query>> {
        match op {
            Comparison::Eq => self.compile_equality(attribute, value),
            Comparison::NotEq => Ok(negate(self.compile_equality(attribute, value)?)),
            Comparison::Lt => self.compile_range(attribute, Bound::Unbounded, Bound::Excluded(value)),
            Comparison::Lte => self.compile_range(attribute, Bound::Unbounded, Bound::Included(value)),
            Comparison::Gt => self.compile_range(attribute, Bound::Excluded(value), Bound::Unbounded),
            Comparison::Gte => self.compile_range(attribute, Bound::Included(value), Bound::Unbounded),
        }
    }

    fn compile_equality(&self, attribute: &str, value: &Literal) -> Result<Box<dyn Query>> {
        let (field, attribute_type) = self.resolve(attribute)?;
        match attribute_type {
            AttributeType::String => Ok(Box::new(TermQuery::new(
                Term::from_field_text(field, &value.as_text()),
                IndexRecordOption::Basic,
            ))),
            AttributeType::Text => {
                let tokens = self.analyze(field, &value.as_text(), false)?;
                self.token_query(attribute, field, tokens)
            }
            AttributeType::Date => {
                let at = coerce_instant(attribute, value)?;
                self.compile_date_range(attribute, Bound::Included(at), Bound::Included(at))
            }
        }
    }

    fn compile_range(&self, attribute: &str, lower: Bound<&Literal>, upper: Bound<&Literal>) -> Result<Box<dyn Query>> {
        let (_, attribute_type) = self.resolve(attribute)?;
        match attribute_type {
            AttributeType::String => {
                let lower = lower.map(Literal::as_text);
                let upper = upper.map(Literal::as_text);
                Ok(Box::new(RangeQuery::new_str_bounds(
                    attribute.to_string(),
                    lower.as_ref().map(String::as_str),
                    upper.as_ref().map(String::as_str),
                )))
            }
            AttributeType::Date => {
                let lower = coerce_bound(attribute, lower)?;
                let upper = coerce_bound(attribute, upper)?;
                self.compile_date_range(attribute, lower, upper)
            }
            AttributeType::Text => Err(anyhow!("range comparison is not supported on text attribute '{}'", attribute)),
        }
    }

    fn compile_date_range(
        &self,
        attribute: &str,
        lower: Bound<DateTime<Utc>>,
        upper: Bound<DateTime<Utc>>,
    ) -> Result<Box<dyn Query>> {
        let (_, attribute_type) = self.resolve(attribute)?;
        if attribute_type != AttributeType::Date {
            return Err(anyhow!("temporal predicate on non-date attribute '{}'", attribute));
        }
        Ok(Box::new(RangeQuery::new_date_bounds(
            attribute.to_string(),
            lower.map(index_date),
            upper.map(index_date),
        )))
    }

    fn compile_like(&self, attribute: &str, pattern: &str, case_insensitive: bool) -> Result<Box<dyn Query>> {
        let (field, attribute_type) = self.resolve(attribute)?;
        match attribute_type {
            // Indexed text tokens are already lower-cased, so ILIKE and LIKE coincide.
            AttributeType::Text => {
                let tokens = self.analyze(field, pattern, true)?;
                self.token_query(attribute, field, tokens)
            }
            AttributeType::String => {
                let regex = like_to_regex(pattern, case_insensitive);
                let query = RegexQuery::from_pattern(&regex, field)
                    .map_err(|e| anyhow!("Invalid LIKE pattern '{}': {}", pattern, e))?;
                Ok(Box::new(query))
            }
            AttributeType::Date => Err(anyhow!("LIKE is not supported on date attribute '{}'", attribute)),
        }
    }

    fn compile_not_null(&self, attribute: &str) -> Result<Box<dyn Query>> {
        let (field, attribute_type) = self.resolve(attribute)?;
        match attribute_type {
            AttributeType::Text | AttributeType::String => {
                let query = RegexQuery::from_pattern(".*", field)
                    .map_err(|e| anyhow!("Invalid wildcard regex pattern: {}", e))?;
                Ok(Box::new(query))
            }
            AttributeType::Date => self.compile_date_range(attribute, Bound::Unbounded, Bound::Unbounded),
        }
    }

    /// The analyzer the index applies to `field`
    fn analyzer(&self, field: Field) -> Result<TextAnalyzer> {
        let entry = self.registry.tantivy_schema().get_field_entry(field);
        let tokenizer = match entry.field_type() {
            FieldType::Str(options) => options.get_indexing_options().map(|indexing| indexing.tokenizer()),
            _ => None,
        }
        .ok_or_else(|| anyhow!("Attribute '{}' is not an indexed text field", entry.name()))?;
        self.tokenizers
            .get(tokenizer)
            .ok_or_else(|| anyhow!("Tokenizer '{}' is not registered", tokenizer))
    }

    /// Tokenize `value` as the index does. With `wildcards`, terms joined by
    /// `%` (or touching a leading or trailing `%`) become one regex token.
    fn analyze(&self, field: Field, value: &str, wildcards: bool) -> Result<Vec<PatternToken>> {
        let mut analyzer = self.analyzer(field)?;
        let mut tokens: Vec<Token> = Vec::new();
        let mut stream = analyzer.token_stream(value);
        stream.process(&mut |token: &Token| tokens.push(token.clone()));

        if !wildcards {
            return Ok(tokens
                .into_iter()
                .map(|token| PatternToken::Plain { text: token.text, position: token.position })
                .collect());
        }

        let mut groups: Vec<Vec<Token>> = Vec::new();
        for token in tokens {
            let glued = groups
                .last()
                .and_then(|group| group.last())
                .and_then(|previous| value.get(previous.offset_to..token.offset_from))
                .is_some_and(is_wildcard_run);
            match groups.last_mut() {
                Some(group) if glued => group.push(token),
                _ => groups.push(vec![token]),
            }
        }
        Ok(groups.iter().filter_map(|group| pattern_token(value, group)).collect())
    }

    /// A phrase for several plain terms, a conjunction when wildcards are
    /// involved. A value the analyzer reduces to nothing matches every record
    /// holding the attribute, since the index dropped the same tokens.
    fn token_query(&self, attribute: &str, field: Field, tokens: Vec<PatternToken>) -> Result<Box<dyn Query>> {
        let all_plain = tokens.iter().all(|token| matches!(token, PatternToken::Plain { .. }));
        if tokens.len() > 1 && all_plain {
            let terms = tokens
                .into_iter()
                .filter_map(|token| match token {
                    PatternToken::Plain { text, position } => Some((position, Term::from_field_text(field, &text))),
                    PatternToken::Wildcard(_) => None,
                })
                .collect();
            return Ok(Box::new(PhraseQuery::new_with_offset(terms)));
        }

        let mut queries = tokens
            .into_iter()
            .map(|token| single_token_query(field, token))
            .collect::<Result<Vec<_>>>()?;
        match queries.len() {
            0 => self.compile_not_null(attribute),
            1 => queries.pop().ok_or_else(|| anyhow!("empty token list")),
            _ => Ok(Box::new(BooleanQuery::new(
                queries.into_iter().map(|query| (Occur::Must, query)).collect(),
            ))),
        }
    }

    fn resolve(&self, attribute: &str) -> Result<(Field, AttributeType)> {
        let spec = self
            .registry
            .attribute(attribute)
            .ok_or_else(|| anyhow!("Attribute '{}' is not registered", attribute))?;
        let field = self
            .registry
            .tantivy_schema()
            .get_field(attribute)
            .map_err(|_| anyhow!("Attribute '{}' not found in index schema", attribute))?;
        Ok((field, spec.attribute_type))
    }
}

fn negate(query: Box<dyn Query>) -> Box<dyn Query> {
    Box::new(BooleanQuery::new(vec![
        (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
        (Occur::MustNot, query),
    ]))
}

fn coerce_instant(attribute: &str, value: &Literal) -> Result<DateTime<Utc>> {
    value
        .as_instant()
        .ok_or_else(|| anyhow!("{} is not a valid date for attribute '{}'", value, attribute))
}

fn coerce_bound(attribute: &str, bound: Bound<&Literal>) -> Result<Bound<DateTime<Utc>>> {
    Ok(match bound {
        Bound::Included(value) => Bound::Included(coerce_instant(attribute, value)?),
        Bound::Excluded(value) => Bound::Excluded(coerce_instant(attribute, value)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

fn index_date(at: DateTime<Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_secs(at.timestamp())
}

fn is_wildcard_run(gap: &str) -> bool {
    !gap.is_empty() && gap.chars().all(|c| c == '%')
}

fn pattern_token(value: &str, group: &[Token]) -> Option<PatternToken> {
    let first = group.first()?;
    let last = group.last()?;
    let leading = value.get(..first.offset_from).is_some_and(|before| before.ends_with('%'));
    let trailing = value.get(last.offset_to..).is_some_and(|after| after.starts_with('%'));
    if group.len() == 1 && !leading && !trailing {
        return Some(PatternToken::Plain { text: first.text.clone(), position: first.position });
    }

    let mut regex = group
        .iter()
        .map(|token| regex::escape(&token.text))
        .collect::<Vec<_>>()
        .join(".*");
    if leading {
        regex.insert_str(0, ".*");
    }
    if trailing {
        regex.push_str(".*");
    }
    Some(PatternToken::Wildcard(regex))
}

fn single_token_query(field: Field, token: PatternToken) -> Result<Box<dyn Query>> {
    match token {
        PatternToken::Plain { text, .. } => Ok(Box::new(TermQuery::new(
            Term::from_field_text(field, &text),
            IndexRecordOption::WithFreqs,
        ))),
        PatternToken::Wildcard(regex) => {
            let query = RegexQuery::from_pattern(&regex, field)
                .map_err(|e| anyhow!("Invalid wildcard pattern '{}': {}", regex, e))?;
            Ok(Box::new(query))
        }
    }
}

/// Whole-value regex for a LIKE pattern on an untokenized attribute
fn like_to_regex(pattern: &str, case_insensitive: bool) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' => {
                regex.push('\\');
                regex.push(c);
            }
            c if case_insensitive && c.is_alphabetic() => push_case_class(&mut regex, c),
            c => regex.push(c),
        }
    }
    regex
}

fn push_case_class(regex: &mut String, c: char) {
    let mut lower = c.to_lowercase();
    let mut upper = c.to_uppercase();
    match (lower.next(), lower.next(), upper.next(), upper.next()) {
        (Some(l), None, Some(u), None) if l != u => {
            regex.push('[');
            regex.push(l);
            regex.push(u);
            regex.push(']');
        }
        _ => regex.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::Comparison;

    fn compiler() -> FilterCompiler {
        FilterCompiler::new(Arc::new(SchemaRegistry::standard()))
    }

    fn compare(attribute: &str, op: Comparison, value: Literal) -> Filter {
        Filter::Compare { attribute: attribute.to_string(), op, value }
    }

    fn plain(text: &str, position: usize) -> PatternToken {
        PatternToken::Plain { text: text.to_string(), position }
    }

    fn analyze(value: &str, wildcards: bool) -> Vec<PatternToken> {
        let compiler = compiler();
        let (field, _) = compiler.resolve("contents").unwrap();
        compiler.analyze(field, value, wildcards).unwrap()
    }

    #[test]
    fn test_analyze_pattern_tokens() {
        assert_eq!(
            analyze("Grey and WHITE", true),
            vec![plain("grey", 0), plain("and", 1), plain("white", 2)]
        );
        assert_eq!(
            analyze("winter% don't", true),
            vec![PatternToken::Wildcard("winter.*".to_string()), plain("don", 1), plain("t", 2)]
        );
        assert_eq!(
            analyze("%inter%fel% x", true),
            vec![PatternToken::Wildcard(".*inter.*fel.*".to_string()), plain("x", 2)]
        );
        assert!(analyze("!!!", true).is_empty());
    }

    #[test]
    fn test_analyze_matches_index_tokenizer() {
        assert_eq!(analyze("snake_case", true), vec![plain("snake", 0), plain("case", 1)]);

        let long_word = "a".repeat(45);
        assert_eq!(analyze(&format!("now {} end", long_word), false), vec![plain("now", 0), plain("end", 2)]);
        assert!(analyze(&long_word, true).is_empty());
    }

    #[test]
    fn test_like_to_regex() {
        assert_eq!(like_to_regex("U%", false), "U.*");
        assert_eq!(like_to_regex("a_b.c", false), "a.b\\.c");
        assert_eq!(like_to_regex("gb_", true), "[gG][bB].");
        assert_eq!(like_to_regex("1+1", true), "1\\+1");
    }

    #[test]
    fn test_range_on_text_is_rejected() {
        let err = compiler()
            .compile(&compare("contents", Comparison::Gt, Literal::Text("a".to_string())))
            .err()
            .unwrap();
        assert!(err.to_string().contains("contents"));
    }

    #[test]
    fn test_non_date_literal_on_date_is_rejected() {
        let result = compiler().compile(&compare("createdAt", Comparison::Eq, Literal::Text("soon".to_string())));
        assert!(result.is_err());
        let result = compiler().compile(&compare("createdAt", Comparison::Lt, Literal::Number("12".to_string())));
        assert!(result.is_err());
    }

    #[test]
    fn test_temporal_on_string_is_rejected() {
        let filter = Filter::Before { attribute: "countryCode".to_string(), instant: Utc::now() };
        assert!(compiler().compile(&filter).is_err());
    }

    #[test]
    fn test_like_on_date_is_rejected() {
        let filter = Filter::Like {
            attribute: "createdAt".to_string(),
            pattern: "2020%".to_string(),
            case_insensitive: false,
        };
        assert!(compiler().compile(&filter).is_err());
    }

    #[test]
    fn test_unregistered_attribute_is_rejected() {
        let filter = compare("colour", Comparison::Eq, Literal::Text("red".to_string()));
        assert!(compiler().compile(&filter).is_err());
    }

    #[test]
    fn test_supported_predicates_compile() {
        let filters = [
            Filter::Include,
            Filter::Exclude,
            compare("countryCode", Comparison::NotEq, Literal::Text("USA".to_string())),
            compare("title", Comparison::Eq, Literal::Text("A Dance with Dragons".to_string())),
            compare("modifiedAt", Comparison::Gte, Literal::Text("2020-01-01".to_string())),
            Filter::IsNull { attribute: "createdAt".to_string() },
            Filter::IsNull { attribute: "title".to_string() },
            Filter::Like { attribute: "contents".to_string(), pattern: "%".to_string(), case_insensitive: true },
        ];
        for filter in &filters {
            assert!(compiler().compile(filter).is_ok(), "{} should compile", filter);
        }
    }
}
