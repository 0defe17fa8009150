//! Free-text search over changesets.
//!
//! Changeset lists accept a small subset of the query language: bare or
//! quoted terms, optionally negated with `-`. Anything else is reported, and
//! all offending terms are reported together so users can fix their input in
//! one go.

use std::fmt;

use thiserror::Error;

use crate::query::types::Operator;
use crate::query::visitor::{Visitor, walk};
use crate::query::{OperatorKind, Parameter, Pattern, QueryError, SearchType, parse};

/// One search term. `not` excludes changesets containing the term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearchTerm {
    pub term: String,
    pub not: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    #[error("unsupported field in search: {field}")]
    Field { field: String },
    #[error("OR expressions are not supported in changeset search")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangesetSearchError {
    #[error(transparent)]
    Parse(#[from] QueryError),
    #[error("{}", TermErrors(.0))]
    Terms(Vec<TermError>),
}

/// Renders several errors as a bulleted list.
struct TermErrors<'a>(&'a [TermError]);

impl fmt::Display for TermErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [single] => write!(f, "{single}"),
            errors => {
                write!(f, "{} errors occurred:", errors.len())?;
                for err in errors {
                    write!(f, "\n\t* {err}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Default)]
struct TermCollector {
    terms: Vec<TextSearchTerm>,
    errors: Vec<TermError>,
}

impl Visitor for TermCollector {
    fn visit_pattern(&mut self, pattern: &Pattern) {
        self.terms.push(TextSearchTerm {
            term: pattern.value.clone(),
            not: pattern.negated,
        });
    }

    fn visit_parameter(&mut self, parameter: &Parameter) {
        self.errors.push(TermError::Field {
            field: parameter.field.clone(),
        });
    }

    fn visit_operator(&mut self, operator: &Operator) {
        if operator.kind == OperatorKind::Or {
            self.errors.push(TermError::Or);
        }
    }
}

/// Parses `input` into search terms, in input order. Quoted terms are
/// unquoted, so `"foo bar"` is one term.
pub fn parse_text_search(input: &str) -> Result<Vec<TextSearchTerm>, ChangesetSearchError> {
    let nodes = parse(input, SearchType::Standard)?;
    let mut collector = TermCollector::default();
    walk(&mut collector, &nodes);
    if !collector.errors.is_empty() {
        return Err(ChangesetSearchError::Terms(collector.errors));
    }
    log::debug!("parsed {} changeset search terms", collector.terms.len());
    Ok(collector.terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(term: &str, not: bool) -> TextSearchTerm {
        TextSearchTerm {
            term: term.to_string(),
            not,
        }
    }

    #[test]
    fn test_parse_text_search() {
        let terms = parse_text_search(r#"foo "foo bar" -quux -"baz""#).unwrap();
        assert_eq!(
            terms,
            vec![
                term("foo", false),
                term("foo bar", false),
                term("quux", true),
                term("baz", true),
            ]
        );
    }

    #[test]
    fn test_empty_search() {
        assert!(parse_text_search("").unwrap().is_empty());
        assert!(parse_text_search("   ").unwrap().is_empty());
    }

    #[test]
    fn test_single_error() {
        let err = parse_text_search("repo:foo bar").unwrap_err();
        assert_eq!(err.to_string(), "unsupported field in search: repo");
    }

    #[test]
    fn test_all_errors_reported() {
        let err = parse_text_search("repo:a file:b x or y").unwrap_err();
        let ChangesetSearchError::Terms(errors) = &err else {
            panic!("expected term errors, got {err:?}");
        };
        assert_eq!(errors.len(), 3);
        assert!(err.to_string().starts_with("3 errors occurred:"));
        assert!(err.to_string().contains("\n\t* unsupported field in search: file"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse_text_search("x()(y or z)"),
            Err(ChangesetSearchError::Parse(QueryError::Syntax(_)))
        ));
    }
}
