//! Error types for parsing, validating and planning queries.
//!
//! Messages are shown to users as-is, so their wording is part of the
//! contract.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Message for parenthesized input that cannot be interpreted even after
/// the dangling-parentheses fallback.
pub const UNSUPPORTED_PARENS: &str = "unsupported expression. The combination of parentheses in the query have an unclear meaning. Try using the content: filter to quote patterns that contain parentheses";

/// Message for literal queries whose groups end up nested in a
/// concatenation of patterns.
pub const AMBIGUOUS_PARENS: &str = "i'm having trouble understanding that query. The combination of parentheses is the problem. Try using the content: filter to quote patterns that contain parentheses";

/// Like [`AMBIGUOUS_PARENS`], for queries that were never balanced.
pub const UNBALANCED_LITERAL: &str = "this literal search query contains unbalanced parentheses. I tried to guess what you meant, but wasn't able to. Maybe you missed a parenthesis? Otherwise, try using the content: filter if the pattern is unbalanced";

/// A tree shape that a stage cannot process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{msg}")]
pub struct UnsupportedError {
    pub msg: String,
}

impl UnsupportedError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// Errors produced while scanning quoted values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unterminated literal: expected {0}")]
    UnterminatedLiteral(char),
    #[error("unrecognized escape sequence")]
    UnrecognizedEscape,
    #[error("unterminated escape sequence")]
    UnterminatedEscape,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The parser needed an operand and found none. Internally this triggers
    /// the fallback parser.
    #[error("expected operand at {pos}")]
    ExpectedOperand { pos: usize },

    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Malformed syntax with a user-facing explanation.
    #[error("{0}")]
    Syntax(String),

    /// A field or pattern failed a semantic check.
    #[error("{0}")]
    Validation(String),

    #[error("invalid predicate value: {0}")]
    Predicate(String),

    #[error("predicate {name:?} does not support negation")]
    NegatedPredicate { name: String },

    #[error("search context {name:?}: {msg}")]
    SearchContext { name: String, msg: String },

    /// A predicate evaluated to nothing, so the query can match nothing.
    #[error("no results for predicate")]
    NoResults,

    /// The plan has more than one disjunct where exactly one is required.
    #[error("query not supported: the query expands to more than one search")]
    QueryNotSupported,
}

impl QueryError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        QueryError::Syntax(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        QueryError::Validation(msg.into())
    }

    pub fn predicate(msg: impl Into<String>) -> Self {
        QueryError::Predicate(msg.into())
    }
}
