//! Query tree representation.
//!
//! A query is a list of [`Node`]s. Leaves are [`Pattern`]s (search text) and
//! [`Parameter`]s (`field:value` filters); [`Operator`]s combine them. Trees are
//! values: every transform builds a new tree instead of mutating one, and
//! [`new_operator`] keeps operators reduced so that no operator ever holds
//! fewer than two operands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{QueryError, Result, UnsupportedError};
use super::labels::Labels;

/// Selects the leaf grammar and the transform passes applied to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[serde(rename = "regexp", alias = "regex")]
    Regex,
    Literal,
    Structural,
    Lucky,
    #[default]
    Standard,
    Keyword,
}

impl SearchType {
    pub const ALL: [SearchType; 6] = [
        SearchType::Regex,
        SearchType::Literal,
        SearchType::Structural,
        SearchType::Lucky,
        SearchType::Standard,
        SearchType::Keyword,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::Regex => "regexp",
            SearchType::Literal => "literal",
            SearchType::Structural => "structural",
            SearchType::Lucky => "lucky",
            SearchType::Standard => "standard",
            SearchType::Keyword => "keyword",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "regexp" | "regex" => Ok(SearchType::Regex),
            "literal" => Ok(SearchType::Literal),
            "structural" => Ok(SearchType::Structural),
            "lucky" => Ok(SearchType::Lucky),
            "standard" => Ok(SearchType::Standard),
            "keyword" => Ok(SearchType::Keyword),
            _ => Err(QueryError::validation(format!(
                "unrecognized search type {s:?}. Valid values are: literal, regexp, structural, standard, lucky, keyword"
            ))),
        }
    }
}

/// A position in the input. Queries are single-line, so `line` is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Byte range of a node in the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Range {
    pub start: Location,
    pub end: Location,
}

pub fn new_range(start: usize, end: usize) -> Range {
    Range {
        start: Location { line: 0, column: start },
        end: Location { line: 0, column: end },
    }
}

/// Information attached to every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Annotation {
    pub labels: Labels,
    pub range: Range,
}

impl Annotation {
    pub fn new(labels: Labels, range: Range) -> Self {
        Self { labels, range }
    }
}

/// Leaf node holding search text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub value: String,
    pub negated: bool,
    pub annotation: Annotation,
}

impl Pattern {
    pub fn new(value: impl Into<String>, labels: Labels, range: Range) -> Self {
        Self {
            value: value.into(),
            negated: false,
            annotation: Annotation::new(labels, range),
        }
    }

    pub fn labels(&self) -> Labels {
        self.annotation.labels
    }
}

/// Leaf node holding a `field:value` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub field: String,
    pub value: String,
    pub negated: bool,
    pub annotation: Annotation,
}

impl Parameter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            negated: false,
            annotation: Annotation::default(),
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Or,
    And,
    /// Ordered juxtaposition of patterns.
    Concat,
}

impl OperatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperatorKind::Or => "or",
            OperatorKind::And => "and",
            OperatorKind::Concat => "concat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub kind: OperatorKind,
    pub operands: Vec<Node>,
    pub annotation: Annotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Pattern(Pattern),
    Parameter(Parameter),
    Operator(Operator),
}

impl Node {
    pub fn is_empty_leaf(&self) -> bool {
        match self {
            Node::Pattern(p) => p.value.is_empty(),
            Node::Parameter(p) => p.value.is_empty(),
            Node::Operator(_) => false,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Node::Pattern(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_parameter(&self) -> Option<&Parameter> {
        match self {
            Node::Parameter(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_operator(&self) -> Option<&Operator> {
        match self {
            Node::Operator(o) => Some(o),
            _ => None,
        }
    }

    /// Source range of the node. Operators span their operands.
    pub fn range(&self) -> Range {
        match self {
            Node::Pattern(p) => p.annotation.range,
            Node::Parameter(p) => p.annotation.range,
            Node::Operator(o) => {
                let start = o.operands.first().map(|n| n.range().start).unwrap_or_default();
                let end = o.operands.last().map(|n| n.range().end).unwrap_or_default();
                Range { start, end }
            }
        }
    }
}

impl From<Pattern> for Node {
    fn from(p: Pattern) -> Self {
        Node::Pattern(p)
    }
}

impl From<Parameter> for Node {
    fn from(p: Parameter) -> Self {
        Node::Parameter(p)
    }
}

impl From<Operator> for Node {
    fn from(o: Operator) -> Self {
        Node::Operator(o)
    }
}

/// Quotes `s` with double quotes, escaping backslashes, quotes and control
/// whitespace.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Pattern(p) => {
                if p.negated {
                    write!(f, "{}", quote(&format!("NOT {}", p.value)))
                } else {
                    write!(f, "{}", quote(&p.value))
                }
            }
            Node::Parameter(p) => {
                let v = if p.field.is_empty() {
                    p.value.clone()
                } else if p.negated {
                    format!("-{}:{}", p.field, p.value)
                } else {
                    format!("{}:{}", p.field, p.value)
                };
                write!(f, "{}", quote(&v))
            }
            Node::Operator(o) => {
                write!(f, "({}", o.kind.as_str())?;
                for operand in &o.operands {
                    write!(f, " {operand}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Renders a node list in the S-expression form used by tests and logs.
pub fn to_string(nodes: &[Node]) -> String {
    nodes.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
}

/// Builds an operator of `kind` over `nodes`, reducing as it goes:
/// nested operators of the same kind are flattened and empty leaves are
/// dropped. Zero operands yield an empty list and a single operand is
/// returned as-is, so the result never holds a degenerate operator.
pub fn new_operator(nodes: Vec<Node>, kind: OperatorKind) -> Vec<Node> {
    if nodes.len() <= 1 {
        return nodes;
    }

    let mut operands = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Operator(op) if op.kind == kind => operands.extend(op.operands),
            node if node.is_empty_leaf() => {}
            node => operands.push(node),
        }
    }

    match operands.len() {
        0 | 1 => operands,
        _ => vec![Node::Operator(Operator {
            kind,
            operands,
            annotation: Annotation::default(),
        })],
    }
}

/// Reports whether every leaf under `nodes` is a pattern.
pub fn is_pattern_expression(nodes: &[Node]) -> bool {
    nodes.iter().all(|node| match node {
        Node::Pattern(_) => true,
        Node::Parameter(_) => false,
        Node::Operator(o) => is_pattern_expression(&o.operands),
    })
}

/// Reports whether any leaf under `node` is a pattern.
pub fn contains_pattern(node: &Node) -> bool {
    match node {
        Node::Pattern(_) => true,
        Node::Parameter(_) => false,
        Node::Operator(o) => o.operands.iter().any(contains_pattern),
    }
}

/// Reports whether any node under `nodes` satisfies `pred`.
pub fn exists(nodes: &[Node], pred: &impl Fn(&Node) -> bool) -> bool {
    nodes.iter().any(|node| {
        pred(node)
            || matches!(node, Node::Operator(o) if exists(&o.operands, pred))
    })
}

/// Unwraps a lone top-level `And` into its operands.
fn lift(nodes: &[Node]) -> Vec<Node> {
    if let [Node::Operator(op)] = nodes {
        if op.kind == OperatorKind::And {
            return op.operands.clone();
        }
    }
    nodes.to_vec()
}

/// Splits a query into its scope parameters and a single pattern expression.
///
/// Fails when a parameter is nested inside an operator, because such a tree
/// cannot be expressed as "parameters AND pattern".
pub fn partition_search_pattern(nodes: &[Node]) -> Result<(Vec<Parameter>, Option<Node>)> {
    let nodes = if nodes.len() == 1 { lift(nodes) } else { nodes.to_vec() };

    let mut parameters = Vec::new();
    let mut patterns = Vec::new();
    for node in nodes {
        match node {
            Node::Parameter(p) => parameters.push(p),
            node if is_pattern_expression(std::slice::from_ref(&node)) => patterns.push(node),
            _ => {
                return Err(UnsupportedError::new(
                    "cannot evaluate: unable to partition pure search pattern",
                )
                .into());
            }
        }
    }

    let pattern = match patterns.len() {
        0 => None,
        1 => patterns.pop(),
        _ => Some(Node::Operator(Operator {
            kind: OperatorKind::And,
            operands: patterns,
            annotation: Annotation::default(),
        })),
    };
    Ok((parameters, pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pat(v: &str) -> Node {
        Pattern::new(v, Labels::LITERAL, Range::default()).into()
    }

    fn param(f: &str, v: &str) -> Node {
        Parameter::new(f, v).into()
    }

    #[test]
    fn test_new_operator_flattens_same_kind() {
        let inner = new_operator(vec![pat("a"), pat("b")], OperatorKind::And);
        let nodes = new_operator(
            inner.into_iter().chain([pat("c")]).collect(),
            OperatorKind::And,
        );
        assert_eq!(to_string(&nodes), r#"(and "a" "b" "c")"#);
    }

    #[test]
    fn test_new_operator_keeps_other_kinds_nested() {
        let inner = new_operator(vec![pat("a"), pat("b")], OperatorKind::Or);
        let nodes = new_operator(
            inner.into_iter().chain([pat("c")]).collect(),
            OperatorKind::And,
        );
        assert_eq!(to_string(&nodes), r#"(and (or "a" "b") "c")"#);
    }

    #[test]
    fn test_new_operator_drops_empty_leaves() {
        let nodes = new_operator(vec![pat(""), pat("a"), param("repo", "")], OperatorKind::And);
        assert_eq!(to_string(&nodes), r#""a""#);
        assert!(new_operator(vec![], OperatorKind::Or).is_empty());
    }

    #[test]
    fn test_new_operator_is_a_fixpoint() {
        for kind in [OperatorKind::And, OperatorKind::Or, OperatorKind::Concat] {
            let inner = new_operator(vec![pat("x"), pat("y")], OperatorKind::Or);
            let nodes: Vec<Node> = vec![pat("a"), inner[0].clone(), param("repo", "r"), pat("")];
            let once = new_operator(nodes, kind);
            let twice = new_operator(once.clone(), kind);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_partition_search_pattern() {
        let nodes = new_operator(vec![param("repo", "foo"), pat("a"), pat("b")], OperatorKind::And);
        let (params, pattern) = partition_search_pattern(&nodes).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(
            pattern.map(|p| p.to_string()),
            Some(r#"(and "a" "b")"#.to_string())
        );
    }

    #[test]
    fn test_partition_rejects_nested_parameters() {
        let or = new_operator(vec![param("repo", "a"), pat("b")], OperatorKind::Or);
        let nodes = vec![param("file", "x"), or[0].clone()];
        assert!(matches!(
            partition_search_pattern(&nodes),
            Err(QueryError::Unsupported(_))
        ));
    }

    #[test]
    fn test_display_escapes_quotes() {
        assert_eq!(pat(r#"a"b"#).to_string(), r#""a\"b""#);
        assert_eq!(param("repo", "x").to_string(), r#""repo:x""#);
        assert_eq!(Node::from(Parameter::new("file", "y").negate()).to_string(), r#""-file:y""#);
    }

    #[test]
    fn test_search_type_from_str() {
        assert_eq!("REGEX".parse::<SearchType>().unwrap(), SearchType::Regex);
        assert_eq!("keyword".parse::<SearchType>().unwrap(), SearchType::Keyword);
        assert!("fuzzy".parse::<SearchType>().is_err());
    }
}
