use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A literal value on the right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Text(String),
    /// Numeric literal, kept as written
    Number(String),
    Date(DateTime<Utc>),
}

impl Literal {
    /// The literal as a keyword value
    pub fn as_text(&self) -> String {
        match self {
            Literal::Text(text) | Literal::Number(text) => text.clone(),
            Literal::Date(at) => at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// The literal as an instant; quoted text is accepted when it reads as a date
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Literal::Date(at) => Some(*at),
            Literal::Text(text) => parse_instant(text),
            Literal::Number(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Literal::Number(number) => f.write_str(number),
            Literal::Date(at) => f.write_str(&at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Comparison::Eq),
            "<>" => Some(Comparison::NotEq),
            "<" => Some(Comparison::Lt),
            "<=" => Some(Comparison::Lte),
            ">" => Some(Comparison::Gt),
            ">=" => Some(Comparison::Gte),
            _ => None,
        }
    }

    /// The operator with its operands swapped: `'a' < x` is `x > 'a'`
    pub fn flipped(self) -> Self {
        match self {
            Comparison::Lt => Comparison::Gt,
            Comparison::Lte => Comparison::Gte,
            Comparison::Gt => Comparison::Lt,
            Comparison::Gte => Comparison::Lte,
            other => other,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "<>",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
        }
    }
}

/// Parsed filter expression. Built once per query string and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Include,
    Exclude,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Compare {
        attribute: String,
        op: Comparison,
        value: Literal,
    },
    Like {
        attribute: String,
        pattern: String,
        case_insensitive: bool,
    },
    In {
        attribute: String,
        values: Vec<Literal>,
    },
    Between {
        attribute: String,
        lower: Literal,
        upper: Literal,
    },
    IsNull {
        attribute: String,
    },
    Before {
        attribute: String,
        instant: DateTime<Utc>,
    },
    After {
        attribute: String,
        instant: DateTime<Utc>,
    },
    During {
        attribute: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Filter {
    /// Every attribute referenced anywhere in the expression
    pub fn attributes(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Filter::Include | Filter::Exclude => {}
            Filter::And(children) | Filter::Or(children) => {
                for child in children {
                    child.collect_attributes(names);
                }
            }
            Filter::Not(inner) => inner.collect_attributes(names),
            Filter::Compare { attribute, .. }
            | Filter::Like { attribute, .. }
            | Filter::In { attribute, .. }
            | Filter::Between { attribute, .. }
            | Filter::IsNull { attribute }
            | Filter::Before { attribute, .. }
            | Filter::After { attribute, .. }
            | Filter::During { attribute, .. } => {
                names.insert(attribute.as_str());
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Filter], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", child)?;
    }
    f.write_str(")")
}

fn instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Include => f.write_str("INCLUDE"),
            Filter::Exclude => f.write_str("EXCLUDE"),
            Filter::And(children) => write_joined(f, children, " AND "),
            Filter::Or(children) => write_joined(f, children, " OR "),
            Filter::Not(inner) => write!(f, "NOT ({})", inner),
            Filter::Compare { attribute, op, value } => write!(f, "{} {} {}", attribute, op.symbol(), value),
            Filter::Like { attribute, pattern, case_insensitive } => {
                let op = if *case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{} {} {}", attribute, op, Literal::Text(pattern.clone()))
            }
            Filter::In { attribute, values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} IN ({})", attribute, values.join(", "))
            }
            Filter::Between { attribute, lower, upper } => {
                write!(f, "{} BETWEEN {} AND {}", attribute, lower, upper)
            }
            Filter::IsNull { attribute } => write!(f, "{} IS NULL", attribute),
            Filter::Before { attribute, instant: at } => write!(f, "{} BEFORE {}", attribute, instant(at)),
            Filter::After { attribute, instant: at } => write!(f, "{} AFTER {}", attribute, instant(at)),
            Filter::During { attribute, start, end } => {
                write!(f, "{} DURING {}/{}", attribute, instant(start), instant(end))
            }
        }
    }
}

/// Parse an ISO-8601 date or date-time; values without an offset are taken as UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(at) = DateTime::parse_from_str(text, format) {
            return Some(at.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_attributes_include_nested_connectors() {
        let filter = Filter::Or(vec![
            Filter::And(vec![
                Filter::Compare {
                    attribute: "title".to_string(),
                    op: Comparison::Eq,
                    value: Literal::Text("x".to_string()),
                },
                Filter::Not(Box::new(Filter::IsNull { attribute: "colour".to_string() })),
            ]),
            Filter::Like {
                attribute: "contents".to_string(),
                pattern: "%".to_string(),
                case_insensitive: false,
            },
            Filter::Include,
        ]);
        let names: Vec<&str> = filter.attributes().into_iter().collect();
        assert_eq!(names, vec!["colour", "contents", "title"]);
    }

    #[test]
    fn test_display_escapes_quotes() {
        let filter = Filter::Like {
            attribute: "contents".to_string(),
            pattern: "don't".to_string(),
            case_insensitive: true,
        };
        assert_eq!(filter.to_string(), "contents ILIKE 'don''t'");
    }

    #[test]
    fn test_parse_instant_formats() {
        let midnight = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_instant("2020-01-02"), Some(midnight));
        assert_eq!(parse_instant("2020-01-02T00:00:00Z"), Some(midnight));
        assert_eq!(parse_instant("2020-01-02T01:00:00+01:00"), Some(midnight));
        assert_eq!(parse_instant("2020-01-02T00:00"), Some(midnight));
        assert_eq!(parse_instant("2020-13-02"), None);
        assert_eq!(parse_instant("yesterday"), None);
    }

    #[test]
    fn test_comparison_flip() {
        assert_eq!(Comparison::Lt.flipped(), Comparison::Gt);
        assert_eq!(Comparison::Gte.flipped(), Comparison::Lte);
        assert_eq!(Comparison::Eq.flipped(), Comparison::Eq);
        assert_eq!(Comparison::from_symbol("<>"), Some(Comparison::NotEq));
    }
}
