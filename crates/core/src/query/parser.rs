//! Search expression parser
//!
//! A search expression is a comma separated list of clauses. Each clause is
//! either a bare literal, matched against every registered field, or
//! `<field><operator><value>` matched against one field:
//!
//! ```text
//! size>10MB,size<20MB,type:image,last modified<2020-01-01
//! ```
//!
//! The characters `, : = < >` can be used literally when escaped with `\`.

use std::fmt;

use jiff::tz::TimeZone;

use super::field::{FieldRegistry, Operand, Relation, SearchField, normalize_field_name};
use crate::error::QueryError;
use crate::record::MetadataRecord;

/// Characters that may be escaped with a backslash
const ESCAPABLE: &[char] = &[',', ':', '=', '<', '>'];

/// Characters that make up an operator
const OPERATOR_CHARS: &[char] = &[':', '=', '<', '>'];

/// Clause operator as written in a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Contains,
    Equal,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Operator {
    pub fn from_delimiter(s: &str) -> Option<Self> {
        match s {
            ":" => Some(Operator::Contains),
            "==" => Some(Operator::Equal),
            "<" => Some(Operator::Less),
            "<=" => Some(Operator::LessOrEqual),
            ">" => Some(Operator::Greater),
            ">=" => Some(Operator::GreaterOrEqual),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Contains => ":",
            Operator::Equal => "==",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
        }
    }

    /// Relation handed to the searcher as `relation(value, field)`.
    ///
    /// `field < value` holds exactly when `value > field`, so every ordering
    /// operator maps to its inverse. `:` is not a comparison.
    pub fn relation(self) -> Option<Relation> {
        match self {
            Operator::Contains => None,
            Operator::Equal => Some(Relation::Equal),
            Operator::Less => Some(Relation::GreaterThan),
            Operator::LessOrEqual => Some(Relation::GreaterOrEqual),
            Operator::Greater => Some(Relation::LessThan),
            Operator::GreaterOrEqual => Some(Relation::LessOrEqual),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum Test {
    AnyField {
        value: String,
        fields: Vec<SearchField>,
        tz: TimeZone,
    },
    Contains {
        field: SearchField,
        value: String,
        tz: TimeZone,
    },
    Compare {
        field: SearchField,
        relation: Relation,
        operand: Operand,
    },
}

/// A compiled clause that can be evaluated against records
#[derive(Debug, Clone)]
pub struct Predicate {
    clause: String,
    test: Test,
}

impl Predicate {
    /// Whether `record` satisfies this clause
    pub fn matches(&self, record: &MetadataRecord) -> bool {
        match &self.test {
            Test::AnyField { value, fields, tz } => fields
                .iter()
                .any(|field| field.kind().contains(value, &field.read(record), tz)),
            Test::Contains { field, value, tz } => {
                field.kind().contains(value, &field.read(record), tz)
            }
            Test::Compare {
                field,
                relation,
                operand,
            } => operand.compare(&field.read(record), *relation),
        }
    }

    /// Source text of the clause, as written
    pub fn clause(&self) -> &str {
        &self.clause
    }

    /// Field this clause targets, `None` for any-field clauses
    pub fn field(&self) -> Option<&SearchField> {
        match &self.test {
            Test::AnyField { .. } => None,
            Test::Contains { field, .. } | Test::Compare { field, .. } => Some(field),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clause)
    }
}

/// Compiles search expressions against a field registry
#[derive(Debug, Clone)]
pub struct QueryParser<'r> {
    registry: &'r FieldRegistry,
    tz: TimeZone,
}

impl<'r> QueryParser<'r> {
    /// Create a parser that interprets zone-less datetimes in the system
    /// time zone
    pub fn new(registry: &'r FieldRegistry) -> Self {
        Self {
            registry,
            tz: TimeZone::system(),
        }
    }

    /// Use `tz` for rendering datetimes and for zone-less literals
    pub fn with_time_zone(mut self, tz: TimeZone) -> Self {
        self.tz = tz;
        self
    }

    /// Lazily compile each clause of `query`. Nothing is evaluated; each
    /// item is produced when the iterator is advanced.
    pub fn parse(&self, query: &str) -> impl Iterator<Item = Result<Predicate, QueryError>> {
        split_clauses(query)
            .into_iter()
            .filter(|clause| !clause.trim().is_empty())
            .map(move |clause| self.parse_clause(query, clause))
    }

    /// Compile every clause, failing on the first invalid one
    pub fn parse_all(&self, query: &str) -> Result<Vec<Predicate>, QueryError> {
        self.parse(query).collect()
    }

    fn parse_clause(&self, query: &str, clause: &str) -> Result<Predicate, QueryError> {
        let Some((start, end)) = find_operator(clause) else {
            return Ok(Predicate {
                clause: clause.trim().to_string(),
                test: Test::AnyField {
                    value: unescape(clause).trim().to_string(),
                    fields: self.registry.fields().to_vec(),
                    tz: self.tz.clone(),
                },
            });
        };

        let key = clause[..start].trim();
        let delimiter = &clause[start..end];
        let value = unescape(&clause[end..]).trim().to_string();

        let field = self
            .registry
            .get(key)
            .ok_or_else(|| QueryError::UnknownField {
                query: query.to_string(),
                original: key.to_string(),
                normalized: normalize_field_name(key),
                valid: self.registry.names(),
            })?
            .clone();

        let operator = Operator::from_delimiter(delimiter).ok_or_else(|| QueryError::Syntax {
            query: query.to_string(),
            operator: delimiter.to_string(),
        })?;

        let test = match operator.relation() {
            None => Test::Contains {
                field,
                value,
                tz: self.tz.clone(),
            },
            Some(relation) => Test::Compare {
                operand: field.kind().parse_operand(&value, &self.tz)?,
                field,
                relation,
            },
        };

        Ok(Predicate {
            clause: clause.trim().to_string(),
            test,
        })
    }
}

/// Split on commas that are not escaped
fn split_clauses(query: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut chars = query.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some(&(_, next)) = chars.peek()
                    && ESCAPABLE.contains(&next)
                {
                    chars.next();
                }
            }
            ',' => {
                clauses.push(&query[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    clauses.push(&query[start..]);
    clauses
}

/// Byte range of the first unescaped run of operator characters
fn find_operator(clause: &str) -> Option<(usize, usize)> {
    let mut chars = clause.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            if let Some(&(_, next)) = chars.peek()
                && ESCAPABLE.contains(&next)
            {
                chars.next();
            }
            continue;
        }
        if OPERATOR_CHARS.contains(&c) {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if !OPERATOR_CHARS.contains(&next) {
                    break;
                }
                end = j + next.len_utf8();
                chars.next();
            }
            return Some((i, end));
        }
    }

    None
}

/// Drop exactly one backslash in front of each escapable character
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && ESCAPABLE.contains(&next)
        {
            continue;
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, size: u64) -> MetadataRecord {
        MetadataRecord::file("media", name, size).with_mime_type("image/png")
    }

    fn parser(registry: &FieldRegistry) -> QueryParser<'_> {
        QueryParser::new(registry).with_time_zone(TimeZone::UTC)
    }

    #[test]
    fn test_split_clauses_respects_escapes() {
        assert_eq!(split_clauses("a,b"), vec!["a", "b"]);
        assert_eq!(split_clauses(r"a\,b,c"), vec![r"a\,b", "c"]);
        assert_eq!(split_clauses("solo"), vec!["solo"]);
    }

    #[test]
    fn test_find_operator_prefers_longest() {
        assert_eq!(find_operator("size<=20MB"), Some((4, 6)));
        assert_eq!(find_operator("size<20MB"), Some((4, 5)));
        assert_eq!(find_operator("name==a"), Some((4, 6)));
        assert_eq!(find_operator(r"a\:b"), None);
        assert_eq!(find_operator("plain"), None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\,b\:c\=d\<e\>f"), "a,b:c=d<e>f");
        assert_eq!(unescape(r"back\slash"), r"back\slash");
        assert_eq!(unescape(r"\\,"), r"\,");
    }

    #[test]
    fn test_operator_relations_are_inverted() {
        assert_eq!(Operator::Less.relation(), Some(Relation::GreaterThan));
        assert_eq!(Operator::LessOrEqual.relation(), Some(Relation::GreaterOrEqual));
        assert_eq!(Operator::Greater.relation(), Some(Relation::LessThan));
        assert_eq!(Operator::GreaterOrEqual.relation(), Some(Relation::LessOrEqual));
        assert_eq!(Operator::Equal.relation(), Some(Relation::Equal));
        assert_eq!(Operator::Contains.relation(), None);
    }

    #[test]
    fn test_size_less_than() {
        let registry = FieldRegistry::bucket();
        let predicates = parser(&registry).parse_all("size<20MB").unwrap();
        assert_eq!(predicates.len(), 1);
        assert!(predicates[0].matches(&record("small.png", 10_000_000)));
        assert!(!predicates[0].matches(&record("large.png", 25_000_000)));
    }

    #[test]
    fn test_size_bounds_inclusive() {
        let registry = FieldRegistry::bucket();
        let p = parser(&registry);
        let exact = record("exact.png", 20_000_000);
        assert!(p.parse_all("size<=20MB").unwrap()[0].matches(&exact));
        assert!(p.parse_all("size>=20MB").unwrap()[0].matches(&exact));
        assert!(p.parse_all("size==20MB").unwrap()[0].matches(&exact));
        assert!(!p.parse_all("size<20MB").unwrap()[0].matches(&exact));
        assert!(!p.parse_all("size>20MB").unwrap()[0].matches(&exact));
    }

    #[test]
    fn test_contains_operator_never_compares() {
        let registry = FieldRegistry::bucket();
        let predicates = parser(&registry).parse_all("size:MB").unwrap();
        assert!(predicates[0].matches(&record("a.png", 12_300_000)));
        // not a byte size literal, but `:` never parses it as one
        assert!(parser(&registry).parse_all("size:whatever").is_ok());
    }

    #[test]
    fn test_any_field_literal() {
        let registry = FieldRegistry::bucket();
        let predicates = parser(&registry).parse_all("png").unwrap();
        assert!(predicates[0].field().is_none());
        assert!(predicates[0].matches(&record("holiday.jpg", 1)));
        assert!(!parser(&registry).parse_all("gif").unwrap()[0].matches(&record("holiday.jpg", 1)));
    }

    #[test]
    fn test_escaped_comma_stays_in_one_clause() {
        let registry = FieldRegistry::bucket();
        let predicates = parser(&registry).parse_all(r"name:a\,b").unwrap();
        assert_eq!(predicates.len(), 1);
        assert!(predicates[0].matches(&record("x-a,b-y.txt", 1)));
        assert!(!predicates[0].matches(&record("a.txt", 1)));
    }

    #[test]
    fn test_escaped_operator_in_any_field_value() {
        let registry = FieldRegistry::bucket();
        let predicates = parser(&registry).parse_all(r"12\:30").unwrap();
        assert!(predicates[0].matches(&record("meeting 12:30.txt", 1)));
    }

    #[test]
    fn test_field_names_normalized() {
        let registry = FieldRegistry::bucket();
        let p = parser(&registry);
        let rec = record("a.png", 1).with_last_modified("2019-06-01T00:00:00Z".parse().unwrap());
        for q in ["last modified<2020-01-01", "Last_Modified<2020-01-01", " LAST MODIFIED <2020-01-01"] {
            assert!(p.parse_all(q).unwrap()[0].matches(&rec), "{q}");
        }
    }

    #[test]
    fn test_multiple_clauses() {
        let registry = FieldRegistry::bucket();
        let predicates = parser(&registry)
            .parse_all("size>10MB, size<20MB ,type:image")
            .unwrap();
        assert_eq!(predicates.len(), 3);
        assert_eq!(predicates[2].clause(), "type:image");
    }

    #[test]
    fn test_unknown_field() {
        let registry = FieldRegistry::bucket();
        let err = parser(&registry).parse_all("Colour:red").unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownField {
                query: "Colour:red".to_string(),
                original: "Colour".to_string(),
                normalized: "colour".to_string(),
                valid: registry.names(),
            }
        );
    }

    #[test]
    fn test_unsupported_operator() {
        let registry = FieldRegistry::bucket();
        for q in ["size=5", "size<>5", "name:=x"] {
            let err = parser(&registry).parse_all(q).unwrap_err();
            assert!(matches!(err, QueryError::Syntax { .. }), "{q}: {err}");
        }
    }

    #[test]
    fn test_bad_literal_is_fatal() {
        let registry = FieldRegistry::bucket();
        let err = parser(&registry).parse_all("name:a,size<huge").unwrap_err();
        assert!(matches!(err, QueryError::ValueParse { ref literal, .. } if literal == "huge"));
    }

    #[test]
    fn test_parse_is_lazy() {
        let registry = FieldRegistry::bucket();
        let p = parser(&registry);
        let mut clauses = p.parse("name:ok,bogus:field");
        assert!(clauses.next().unwrap().is_ok());
        assert!(clauses.next().unwrap().is_err());
        assert!(clauses.next().is_none());
    }

    #[test]
    fn test_empty_clauses_skipped() {
        let registry = FieldRegistry::bucket();
        assert!(parser(&registry).parse_all("").unwrap().is_empty());
        assert_eq!(parser(&registry).parse_all("a,,b,").unwrap().len(), 2);
    }
}
