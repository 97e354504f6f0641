use crate::compiler::ast::{parse_instant, Comparison, Filter, Literal};
use chrono::{DateTime, Utc};
use pest::iterators::Pair;
use pest_derive::Parser;

/// Both CommonQL dialects share one rule set; each has its own entry rule.
#[derive(Parser)]
#[grammar = "compiler/grammars/common.pest"]
#[grammar = "compiler/grammars/extended.pest"]
#[grammar = "compiler/grammars/classic.pest"]
pub struct FilterGrammar;

type BuildResult<T> = Result<T, String>;

/// Build a filter from an `extended_filter` or `classic_filter` pair
pub fn build_filter(pair: Pair<Rule>) -> BuildResult<Filter> {
    match pair.as_rule() {
        Rule::extended_filter | Rule::classic_filter => {
            let inner = pair
                .into_inner()
                .find(|p| p.as_rule() != Rule::EOI)
                .ok_or("empty filter")?;
            build_filter(inner)
        }
        Rule::extended_or | Rule::classic_or => {
            build_connective(pair, Rule::kw_or, Filter::Or)
        }
        Rule::extended_and | Rule::classic_and => {
            build_connective(pair, Rule::kw_and, Filter::And)
        }
        Rule::extended_unary | Rule::classic_unary => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or("empty unary expression")?;
            if first.as_rule() == Rule::kw_not {
                let operand = inner.next().ok_or("NOT without operand")?;
                Ok(Filter::Not(Box::new(build_filter(operand)?)))
            } else {
                build_filter(first)
            }
        }
        Rule::kw_include => Ok(Filter::Include),
        Rule::kw_exclude => Ok(Filter::Exclude),
        Rule::identifier_in => {
            let values = pair
                .into_inner()
                .filter(|p| p.as_rule() == Rule::string)
                .map(|p| Literal::Text(string_value(p)))
                .collect();
            Ok(Filter::In { attribute: "id".to_string(), values })
        }
        Rule::extended_comparison | Rule::classic_comparison => build_comparison(pair, false),
        Rule::reversed_comparison => build_comparison(pair, true),
        Rule::extended_like | Rule::classic_like => build_like(pair),
        Rule::extended_in => build_in(pair),
        Rule::extended_between | Rule::classic_between => build_between(pair),
        Rule::extended_null | Rule::classic_null => build_null(pair),
        Rule::extended_temporal | Rule::classic_temporal => build_temporal(pair),
        other => Err(format!("unexpected rule {:?}", other)),
    }
}

fn build_connective(pair: Pair<Rule>, keyword: Rule, combine: fn(Vec<Filter>) -> Filter) -> BuildResult<Filter> {
    let mut children = pair
        .into_inner()
        .filter(|p| p.as_rule() != keyword)
        .map(build_filter)
        .collect::<BuildResult<Vec<_>>>()?;
    if children.len() == 1 {
        children.pop().ok_or_else(|| "empty expression".to_string())
    } else {
        Ok(combine(children))
    }
}

fn build_comparison(pair: Pair<Rule>, reversed: bool) -> BuildResult<Filter> {
    let mut inner = pair.into_inner();
    let (left, op, right) = (
        inner.next().ok_or("missing operand")?,
        inner.next().ok_or("missing operator")?,
        inner.next().ok_or("missing operand")?,
    );
    let op = Comparison::from_symbol(op.as_str()).ok_or_else(|| format!("unknown operator {}", op.as_str()))?;
    let (attribute, value, op) = if reversed {
        (attribute_name(right), build_literal(left)?, op.flipped())
    } else {
        (attribute_name(left), build_literal(right)?, op)
    };
    Ok(Filter::Compare { attribute, op, value })
}

fn build_like(pair: Pair<Rule>) -> BuildResult<Filter> {
    let mut attribute = None;
    let mut negated = false;
    let mut case_insensitive = false;
    let mut pattern = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_not => negated = true,
            Rule::kw_ilike => case_insensitive = true,
            Rule::kw_like => {}
            Rule::string => pattern = Some(string_value(p)),
            _ => attribute = Some(attribute_name(p)),
        }
    }
    let like = Filter::Like {
        attribute: attribute.ok_or("LIKE without attribute")?,
        pattern: pattern.ok_or("LIKE without pattern")?,
        case_insensitive,
    };
    Ok(negate_if(negated, like))
}

fn build_in(pair: Pair<Rule>) -> BuildResult<Filter> {
    let mut inner = pair.into_inner();
    let attribute = attribute_name(inner.next().ok_or("IN without attribute")?);
    let mut negated = false;
    let mut values = Vec::new();
    for p in inner {
        match p.as_rule() {
            Rule::kw_not => negated = true,
            Rule::kw_in => {}
            _ => values.push(build_literal(p)?),
        }
    }
    Ok(negate_if(negated, Filter::In { attribute, values }))
}

fn build_between(pair: Pair<Rule>) -> BuildResult<Filter> {
    let mut inner = pair.into_inner();
    let attribute = attribute_name(inner.next().ok_or("BETWEEN without attribute")?);
    let mut negated = false;
    let mut bounds = Vec::with_capacity(2);
    for p in inner {
        match p.as_rule() {
            Rule::kw_not => negated = true,
            Rule::kw_between | Rule::kw_and => {}
            _ => bounds.push(build_literal(p)?),
        }
    }
    let mut bounds = bounds.into_iter();
    let (lower, upper) = match (bounds.next(), bounds.next()) {
        (Some(lower), Some(upper)) => (lower, upper),
        _ => return Err("BETWEEN needs two bounds".to_string()),
    };
    Ok(negate_if(negated, Filter::Between { attribute, lower, upper }))
}

fn build_null(pair: Pair<Rule>) -> BuildResult<Filter> {
    let mut inner = pair.into_inner();
    let attribute = attribute_name(inner.next().ok_or("IS NULL without attribute")?);
    let negated = inner.any(|p| p.as_rule() == Rule::kw_not);
    Ok(negate_if(negated, Filter::IsNull { attribute }))
}

fn build_temporal(pair: Pair<Rule>) -> BuildResult<Filter> {
    let mut inner = pair.into_inner();
    let attribute = attribute_name(inner.next().ok_or("temporal predicate without attribute")?);
    let op = inner.next().ok_or("missing temporal operator")?;
    let operand = inner.next().ok_or("missing temporal operand")?;
    match op.as_rule() {
        Rule::kw_before => Ok(Filter::Before { attribute, instant: date_value(operand)? }),
        Rule::kw_after => Ok(Filter::After { attribute, instant: date_value(operand)? }),
        Rule::kw_during => {
            let mut period = operand.into_inner();
            let start = date_value(period.next().ok_or("period without start")?)?;
            let end = date_value(period.next().ok_or("period without end")?)?;
            if end < start {
                return Err(format!("period ends before it starts: {}/{}", start, end));
            }
            Ok(Filter::During { attribute, start, end })
        }
        other => Err(format!("unexpected temporal operator {:?}", other)),
    }
}

fn negate_if(negated: bool, filter: Filter) -> Filter {
    if negated {
        Filter::Not(Box::new(filter))
    } else {
        filter
    }
}

fn build_literal(pair: Pair<Rule>) -> BuildResult<Literal> {
    match pair.as_rule() {
        Rule::string => Ok(Literal::Text(string_value(pair))),
        Rule::number => Ok(Literal::Number(pair.as_str().to_string())),
        Rule::date_time => Ok(Literal::Date(date_value(pair)?)),
        other => Err(format!("unexpected literal {:?}", other)),
    }
}

/// Unquote a string literal; `''` stands for a single quote
fn string_value(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|inner| inner.as_str().replace("''", "'"))
        .unwrap_or_default()
}

fn date_value(pair: Pair<Rule>) -> BuildResult<DateTime<Utc>> {
    parse_instant(pair.as_str()).ok_or_else(|| format!("invalid date '{}'", pair.as_str()))
}

/// Attribute name from a bare, quoted or classic attribute pair
fn attribute_name(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::extended_attribute | Rule::quoted_attribute => pair
            .into_inner()
            .next()
            .map(attribute_name)
            .unwrap_or_default(),
        _ => pair.as_str().to_string(),
    }
}
