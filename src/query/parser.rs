//! Recursive-descent parser for the query language.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or     := and ("or" and)*
//! and    := leaves ("and" leaves)*
//! leaves := (parameter | pattern | "(" or ")" | "not" leaf)*
//! ```
//!
//! Parentheses are ambiguous: `foo(bar)` is a pattern, `(a or b)` is a group.
//! The primary parser reads balanced parentheses as pattern text where it can.
//! When it runs out of operands or ends unbalanced, a fallback parser reads
//! stray parentheses as pattern text instead.

use bitflags::bitflags;

use super::error::{AMBIGUOUS_PARENS, QueryError, Result, UNBALANCED_LITERAL, UNSUPPORTED_PARENS, UnsupportedError};
use super::fields::Registry;
use super::hoist::hoist;
use super::labels::Labels;
use super::scanner::{scan_balanced_pattern, scan_delimited, scan_field, scan_predicate, scan_value};
use super::types::{
    Annotation, Node, OperatorKind, Parameter, Pattern, SearchType, contains_pattern, exists, new_operator,
    new_range,
};

const NOT_EXPRESSION: &str = "it looks like you tried to use an expression after NOT. The NOT operator can only be used with simple search patterns or filters, and is not supported for expressions or subqueries";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Heuristics: u8 {
        /// Read balanced parentheses as pattern text when possible.
        const PARENS_AS_PATTERNS = 1;
        /// Read any parenthesis as pattern text. Set by the fallback parser.
        const ALLOW_DANGLING_PARENS = 1 << 1;
        /// A parenthesis was read as grouping syntax.
        const DISAMBIGUATED = 1 << 2;
    }
}

/// Options selecting how a query string is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    pub search_type: SearchType,
    /// Read `repo:`, `file:` and `repohasfile:` values as globs.
    pub globbing: bool,
}

struct QueryParser<'a> {
    input: &'a str,
    pos: usize,
    heuristics: Heuristics,
    balanced: i32,
    search_type: SearchType,
    registry: &'a Registry,
}

impl<'a> QueryParser<'a> {
    fn new(input: &'a str, search_type: SearchType, registry: &'a Registry, heuristics: Heuristics) -> Self {
        Self {
            input,
            pos: 0,
            heuristics,
            balanced: 0,
            search_type,
            registry,
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn prev_char(&self) -> Option<char> {
        self.input[..self.pos].chars().next_back()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn is_set(&self, heuristic: Heuristics) -> bool {
        self.heuristics.contains(heuristic)
    }

    /// Reports whether the input at the cursor starts with `keyword`
    /// (case-insensitively) followed by whitespace.
    fn at_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        rest.get(..keyword.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
            && rest[keyword.len()..].starts_with(char::is_whitespace)
    }

    /// A binary keyword must also be preceded by whitespace.
    fn match_keyword(&self, keyword: &str) -> bool {
        self.prev_char().is_some_and(char::is_whitespace) && self.at_keyword(keyword)
    }

    /// A unary keyword may also start the input or follow `(`.
    fn match_unary_keyword(&self, keyword: &str) -> bool {
        let boundary = match self.prev_char() {
            None => true,
            Some(c) => c.is_whitespace() || c == '(',
        };
        boundary && self.at_keyword(keyword)
    }

    fn expect_keyword(&mut self, keyword: &str) -> bool {
        if !self.at_keyword(keyword) {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn parse_or(&mut self) -> Result<Vec<Node>> {
        let left = self.parse_and()?;
        if !self.expect_keyword("or") {
            return Ok(left);
        }
        let right = self.parse_or()?;
        Ok(new_operator(left.into_iter().chain(right).collect(), OperatorKind::Or))
    }

    fn parse_and(&mut self) -> Result<Vec<Node>> {
        let left = if self.search_type == SearchType::Regex {
            self.parse_leaves_regexp()?
        } else {
            self.parse_leaves_literal()?
        };
        if left.is_empty() {
            return Err(QueryError::ExpectedOperand { pos: self.pos });
        }
        if !self.expect_keyword("and") {
            return Ok(left);
        }
        let right = self.parse_and()?;
        Ok(new_operator(left.into_iter().chain(right).collect(), OperatorKind::And))
    }

    /// Opens a group at `(` and parses its contents.
    fn parse_group(&mut self) -> Result<Vec<Node>> {
        self.pos += 1;
        self.balanced += 1;
        self.heuristics |= Heuristics::DISAMBIGUATED;
        self.parse_or()
    }

    fn parse_leaves_literal(&mut self) -> Result<Vec<Node>> {
        let mut nodes: Vec<Node> = Vec::new();
        loop {
            self.skip_whitespace();
            if self.is_eof() || self.match_keyword("and") || self.match_keyword("or") {
                break;
            }
            if self.match_unary_keyword("not") {
                nodes.extend(self.parse_not()?);
                continue;
            }

            match self.peek_char() {
                Some('(') => {
                    let start = self.pos;
                    if self.is_set(Heuristics::PARENS_AS_PATTERNS) {
                        if let Some((value, advance)) = scan_balanced_pattern(self.rest(), self.registry) {
                            self.pos += advance;
                            let labels = Labels::LITERAL | Labels::HEURISTIC_PARENS_AS_PATTERNS;
                            nodes.push(Pattern::new(value, labels, new_range(start, self.pos)).into());
                            continue;
                        }
                    }
                    if self.is_set(Heuristics::ALLOW_DANGLING_PARENS) {
                        let mut pattern = self.parse_pattern_literal();
                        pattern.annotation.labels |= Labels::HEURISTIC_DANGLING_PARENS;
                        nodes.push(pattern.into());
                        continue;
                    }
                    nodes.extend(self.parse_group()?);
                }
                Some(')') if self.balanced <= 0 => {
                    let start = self.pos;
                    let (value, advance, _) = scan_value(self.rest(), true);
                    self.pos += advance;
                    let labels = Labels::LITERAL | Labels::HEURISTIC_DANGLING_PARENS;
                    let pattern = Pattern::new(value, labels, new_range(start, self.pos));

                    // A paren written right after a pattern belongs to it.
                    let glued = start > 0 && !self.input[..start].ends_with(char::is_whitespace);
                    if glued {
                        if let Some(Node::Pattern(previous)) = nodes.last_mut() {
                            *previous = concat_patterns(previous.clone(), pattern)?;
                            continue;
                        }
                    }
                    nodes.push(pattern.into());
                }
                Some(')') => {
                    let start = self.pos;
                    self.pos += 1;
                    self.balanced -= 1;
                    self.heuristics |= Heuristics::DISAMBIGUATED;
                    if nodes.is_empty() {
                        let labels = Labels::LITERAL | Labels::HEURISTIC_PARENS_AS_PATTERNS;
                        nodes.push(Pattern::new("()", labels, new_range(start.saturating_sub(1), self.pos)).into());
                    }
                    break;
                }
                _ => nodes.push(self.parse_leaf()?),
            }
        }
        Ok(partition_parameters(nodes))
    }

    fn parse_leaves_regexp(&mut self) -> Result<Vec<Node>> {
        let mut nodes: Vec<Node> = Vec::new();
        let dangling = self.is_set(Heuristics::ALLOW_DANGLING_PARENS);
        loop {
            self.skip_whitespace();
            if self.is_eof() || self.match_keyword("and") || self.match_keyword("or") {
                break;
            }
            if self.match_unary_keyword("not") {
                nodes.extend(self.parse_not()?);
                continue;
            }

            match self.peek_char() {
                Some('(') if !dangling => {
                    if self.is_set(Heuristics::PARENS_AS_PATTERNS) {
                        let start = self.pos;
                        if let Some((value, advance)) = scan_balanced_pattern(self.rest(), self.registry) {
                            self.pos += advance;
                            nodes.push(Pattern::new(value, Labels::REGEXP, new_range(start, self.pos)).into());
                            continue;
                        }
                    }
                    nodes.extend(self.parse_group()?);
                }
                Some(')') if !dangling => {
                    let start = self.pos;
                    self.pos += 1;
                    self.balanced -= 1;
                    self.heuristics |= Heuristics::DISAMBIGUATED;
                    if nodes.is_empty() {
                        if self.is_set(Heuristics::PARENS_AS_PATTERNS) {
                            let labels = Labels::LITERAL | Labels::HEURISTIC_PARENS_AS_PATTERNS;
                            let range = new_range(start.saturating_sub(1), self.pos);
                            nodes.push(Pattern::new("()", labels, range).into());
                        } else {
                            // An empty group; dropped when operators are built.
                            nodes.push(Parameter::new("", "").into());
                        }
                    }
                    break;
                }
                _ => nodes.push(self.parse_leaf()?),
            }
        }
        Ok(partition_parameters(nodes))
    }

    /// Parses a parameter, a `-pattern`, or a plain pattern.
    fn parse_leaf(&mut self) -> Result<Node> {
        if let Some(parameter) = self.parse_parameter()? {
            return Ok(parameter.into());
        }
        if let Some(pattern) = self.parse_negated_pattern() {
            return Ok(pattern.into());
        }
        Ok(self.parse_pattern().into())
    }

    /// Parses `NOT operand`. A `NOT` with nothing after it negates nothing
    /// and yields no node.
    fn parse_not(&mut self) -> Result<Option<Node>> {
        let start = self.pos;
        self.pos += "not".len();
        self.skip_whitespace();
        if self.peek_char() == Some('(') {
            return Err(QueryError::syntax(NOT_EXPRESSION));
        }

        if let Some(mut parameter) = self.parse_parameter()? {
            if parameter.negated {
                return Err(QueryError::syntax(format!(
                    "unexpected NOT before \"-{}:{}\". Remove NOT and try again",
                    parameter.field, parameter.value
                )));
            }
            parameter.negated = true;
            parameter.annotation.range = new_range(start, self.pos);
            return Ok(Some(parameter.into()));
        }

        let mut pattern = self.parse_pattern();
        if pattern.value.is_empty() {
            log::debug!("dropping empty NOT at {start}");
            return Ok(None);
        }
        pattern.negated = true;
        pattern.annotation.range = new_range(start, self.pos);
        Ok(Some(pattern.into()))
    }

    /// Parses `-pattern`. A lone `-`, `--` and `-(` are not negations.
    fn parse_negated_pattern(&mut self) -> Option<Pattern> {
        let mut chars = self.rest().chars();
        if chars.next() != Some('-') {
            return None;
        }
        match chars.next() {
            Some(c) if !c.is_whitespace() && !matches!(c, '-' | '(' | ')') => {}
            _ => return None,
        }

        let start = self.pos;
        self.pos += 1;
        let mut pattern = self.parse_pattern();
        if pattern.value.is_empty() {
            self.pos = start;
            return None;
        }
        pattern.negated = true;
        pattern.annotation.range = new_range(start, self.pos);
        Some(pattern)
    }

    fn parse_pattern(&mut self) -> Pattern {
        if self.search_type == SearchType::Regex {
            self.parse_pattern_regexp()
        } else {
            self.parse_pattern_literal()
        }
    }

    /// Reads a quoted or slash-delimited pattern. The closing delimiter must
    /// be followed by whitespace or the end of input, otherwise nothing is
    /// consumed.
    fn try_parse_delimited(&mut self) -> Option<(String, char)> {
        let delimiter = match self.peek_char()? {
            c @ ('"' | '\'') => c,
            '/' => '/',
            _ => return None,
        };
        let (value, advance) = scan_delimited(self.rest(), false, delimiter).ok()?;
        let after = &self.rest()[advance..];
        if !after.is_empty() && !after.starts_with(char::is_whitespace) {
            return None;
        }
        self.pos += advance;
        Some((value, delimiter))
    }

    fn parse_pattern_literal(&mut self) -> Pattern {
        let start = self.pos;
        // Quotes are pattern text in literal and structural search.
        let quoting = !matches!(self.search_type, SearchType::Literal | SearchType::Structural);
        if quoting {
            if let Some((value, delimiter)) = self.try_parse_delimited() {
                let labels = if delimiter == '/' {
                    Labels::REGEXP
                } else {
                    Labels::LITERAL | Labels::QUOTED
                };
                return Pattern::new(value, labels, new_range(start, self.pos));
            }
        }

        if let Some((value, advance)) = scan_balanced_pattern(self.rest(), self.registry) {
            self.pos += advance;
            return Pattern::new(value, Labels::LITERAL, new_range(start, self.pos));
        }

        let (value, advance, _) = scan_value(self.rest(), self.is_set(Heuristics::ALLOW_DANGLING_PARENS));
        self.pos += advance;
        Pattern::new(value, Labels::LITERAL, new_range(start, self.pos))
    }

    fn parse_pattern_regexp(&mut self) -> Pattern {
        let start = self.pos;
        if let Some((value, delimiter)) = self.try_parse_delimited() {
            let labels = if delimiter == '/' {
                Labels::REGEXP
            } else {
                Labels::LITERAL | Labels::QUOTED
            };
            return Pattern::new(value, labels, new_range(start, self.pos));
        }

        if self.is_set(Heuristics::PARENS_AS_PATTERNS) {
            if let Some((value, advance)) = scan_balanced_pattern(self.rest(), self.registry) {
                self.pos += advance;
                return Pattern::new(value, Labels::REGEXP, new_range(start, self.pos));
            }
        }

        let (value, advance, saw_dangling) =
            scan_value(self.rest(), self.is_set(Heuristics::ALLOW_DANGLING_PARENS));
        self.pos += advance;
        let labels = if saw_dangling {
            Labels::REGEXP | Labels::HEURISTIC_DANGLING_PARENS
        } else {
            Labels::REGEXP
        };
        Pattern::new(value, labels, new_range(start, self.pos))
    }

    /// Parses `[-]field:value` at the cursor, or returns `None` without
    /// consuming anything when the input is not a recognized field.
    fn parse_parameter(&mut self) -> Result<Option<Parameter>> {
        let Some(scanned) = scan_field(self.rest(), self.registry) else {
            return Ok(None);
        };
        let start = self.pos;
        self.pos += scanned.len;
        let (value, labels) = self.parse_field_value(&scanned.field)?;
        Ok(Some(Parameter {
            field: scanned.field,
            value,
            negated: scanned.negated,
            annotation: Annotation::new(labels, new_range(start, self.pos)),
        }))
    }

    fn parse_field_value(&mut self, field: &str) -> Result<(String, Labels)> {
        if let Some((value, advance)) = scan_predicate(field, self.rest(), self.registry) {
            self.pos += advance;
            return Ok((value, Labels::IS_PREDICATE));
        }

        if let Some(delimiter @ ('"' | '\'')) = self.peek_char() {
            let (value, advance) = scan_delimited(self.rest(), true, delimiter)?;
            self.pos += advance;
            return Ok((value, Labels::QUOTED));
        }

        // A trailing `)` may close a group rather than belong to the value,
        // as in `(a repo:foo)`.
        if let Some((value, advance)) = scan_balanced_pattern(self.rest(), self.registry) {
            self.pos += advance;
            return Ok((value, Labels::empty()));
        }
        let (value, advance, _) = scan_value(self.rest(), false);
        self.pos += advance;
        Ok((value, Labels::empty()))
    }
}

/// Groups sibling nodes so that the order of patterns is kept while the order
/// of parameters is not: `repo:foo bar baz` becomes
/// `(and "repo:foo" (concat "bar" "baz"))`.
pub fn partition_parameters(nodes: Vec<Node>) -> Vec<Node> {
    let (ordered, mut unordered): (Vec<Node>, Vec<Node>) = nodes.into_iter().partition(contains_pattern);
    if ordered.len() > 1 {
        unordered.extend(new_operator(ordered, OperatorKind::Concat));
    } else {
        unordered.extend(ordered);
    }
    new_operator(unordered, OperatorKind::And)
}

/// Appends `right` to `left`. The patterns must be adjacent in the input.
pub fn concat_patterns(mut left: Pattern, right: Pattern) -> Result<Pattern> {
    let left_end = left.annotation.range.end.column;
    let right_start = right.annotation.range.start.column;
    if left_end != right_start {
        log::warn!(
            "cannot concatenate non-adjacent patterns {:?} (ends at {left_end}) and {:?} (starts at {right_start})",
            left.value,
            right.value
        );
        return Err(UnsupportedError::new("invalid query syntax").into());
    }
    left.value.push_str(&right.value);
    left.annotation.labels |= right.annotation.labels;
    left.annotation.range.end.column += right.value.len();
    Ok(left)
}

/// Rejects literal queries where a group sits inside a concatenation, as in
/// `x (a or b)`, since it is unclear whether the parentheses are text.
fn validate_pure_literal_pattern(nodes: &[Node], balanced: bool) -> Result<()> {
    let ambiguous = exists(nodes, &|node| match node {
        Node::Operator(op) if op.kind == OperatorKind::Concat => op
            .operands
            .iter()
            .any(|operand| matches!(operand, Node::Operator(inner) if inner.kind != OperatorKind::Concat)),
        _ => false,
    });
    if !ambiguous {
        return Ok(());
    }
    Err(QueryError::syntax(if balanced { AMBIGUOUS_PARENS } else { UNBALANCED_LITERAL }))
}

fn checks_pure_literal(search_type: SearchType) -> bool {
    matches!(search_type, SearchType::Literal | SearchType::Standard)
}

/// Reparses `input` reading every stray parenthesis as pattern text.
fn parse_fallback(input: &str, search_type: SearchType, registry: &Registry) -> Result<Vec<Node>> {
    let mut parser = QueryParser::new(input, search_type, registry, Heuristics::ALLOW_DANGLING_PARENS);
    let mut nodes = parser.parse_or()?;
    if let Ok(hoisted) = hoist(&nodes) {
        nodes = hoisted;
    }
    if checks_pure_literal(search_type) {
        validate_pure_literal_pattern(&nodes, false)?;
    }
    Ok(new_operator(nodes, OperatorKind::And))
}

/// Parses `input` with the standard field and predicate tables.
pub fn parse(input: &str, search_type: SearchType) -> Result<Vec<Node>> {
    parse_with(input, search_type, Registry::standard())
}

/// Parses `input` into a reduced node list. Blank input yields an empty list.
pub fn parse_with(input: &str, search_type: SearchType, registry: &Registry) -> Result<Vec<Node>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parser = QueryParser::new(input, search_type, registry, Heuristics::PARENS_AS_PATTERNS);
    let mut nodes = match parser.parse_or() {
        Ok(nodes) => nodes,
        Err(err @ QueryError::ExpectedOperand { .. }) => {
            log::debug!("retrying {input:?} with the fallback parser: {err}");
            return parse_fallback(input, search_type, registry).map_err(|_| err);
        }
        Err(err) => return Err(err),
    };

    if parser.balanced != 0 {
        log::debug!("retrying {input:?} with the fallback parser: unbalanced parentheses");
        return parse_fallback(input, search_type, registry).map_err(|err| {
            log::debug!("fallback parser failed: {err}");
            QueryError::syntax(UNSUPPORTED_PARENS)
        });
    }

    if !parser.is_set(Heuristics::DISAMBIGUATED) {
        match hoist(&nodes) {
            Ok(hoisted) => nodes = hoisted,
            Err(err) => log::trace!("not hoisting {input:?}: {err}"),
        }
    }
    if checks_pure_literal(search_type) {
        validate_pure_literal_pattern(&nodes, true)?;
    }
    Ok(new_operator(nodes, OperatorKind::And))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::to_string;

    fn parsed(input: &str, search_type: SearchType) -> String {
        to_string(&parse(input, search_type).unwrap())
    }

    fn standard(input: &str) -> String {
        parsed(input, SearchType::Standard)
    }

    #[test]
    fn test_blank_input() {
        assert!(parse("", SearchType::Standard).unwrap().is_empty());
        assert!(parse("   ", SearchType::Regex).unwrap().is_empty());
    }

    #[test]
    fn test_parameters_and_patterns() {
        assert_eq!(standard("repo:foo bar baz"), r#"(and "repo:foo" (concat "bar" "baz"))"#);
        assert_eq!(standard("-file:x y"), r#"(and "-file:x" "y")"#);
        assert_eq!(standard("a:b"), r#""a:b""#);
    }

    #[test]
    fn test_and_or_precedence() {
        assert_eq!(standard("a or b and c"), r#"(or "a" (and "b" "c"))"#);
        assert_eq!(standard("a AND b OR c"), r#"(or (and "a" "b") "c")"#);
        assert_eq!(standard("(a or b) and c"), r#"(and (or "a" "b") "c")"#);
    }

    #[test]
    fn test_keywords_need_whitespace() {
        assert_eq!(standard("android orange"), r#"(concat "android" "orange")"#);
        assert_eq!(standard("a or"), r#"(concat "a" "or")"#);
    }

    #[test]
    fn test_parens_as_patterns() {
        assert_eq!(standard("foo(bar)"), r#""foo(bar)""#);
        assert_eq!(standard("(hello there)"), r#""(hello there)""#);
        assert_eq!(standard("()"), r#""()""#);
        assert_eq!(parsed("(a b) or c", SearchType::Regex), r#"(or "(a b)" "c")"#);
    }

    #[test]
    fn test_dangling_paren_fallback() {
        assert_eq!(
            parsed("repo:foo foo( or bar(", SearchType::Literal),
            r#"(and "repo:foo" (or "foo(" "bar("))"#
        );
        assert_eq!(standard("foo)"), r#""foo)""#);
    }

    #[test]
    fn test_dangling_paren_labels() {
        let nodes = parse("foo)", SearchType::Standard).unwrap();
        let pattern = nodes[0].as_pattern().unwrap();
        assert!(pattern.labels().contains(Labels::HEURISTIC_DANGLING_PARENS));
        assert_eq!(pattern.annotation.range, new_range(0, 4));
    }

    #[test]
    fn test_ambiguous_parens() {
        let err = parse("repo:foo (bar and baz))", SearchType::Standard).unwrap_err();
        assert_eq!(err.to_string(), AMBIGUOUS_PARENS);
        let err = parse("x()(y or z)", SearchType::Literal).unwrap_err();
        assert_eq!(err.to_string(), AMBIGUOUS_PARENS);
    }

    #[test]
    fn test_regexp_unbalanced_falls_back() {
        let nodes = parse("foo)", SearchType::Regex).unwrap();
        let pattern = nodes[0].as_pattern().unwrap();
        assert_eq!(pattern.value, "foo)");
        assert!(pattern.labels().contains(Labels::HEURISTIC_DANGLING_PARENS));
    }

    #[test]
    fn test_quoted_and_slash_patterns() {
        let nodes = parse(r#""foo bar" /b.z/"#, SearchType::Standard).unwrap();
        let operands = &nodes[0].as_operator().unwrap().operands;
        let quoted = operands[0].as_pattern().unwrap();
        assert_eq!(quoted.value, "foo bar");
        assert!(quoted.labels().contains(Labels::QUOTED));
        let regexp = operands[1].as_pattern().unwrap();
        assert_eq!(regexp.value, "b.z");
        assert!(regexp.labels().contains(Labels::REGEXP));
    }

    #[test]
    fn test_quotes_are_literal_in_literal_search() {
        let nodes = parse(r#""foo bar""#, SearchType::Literal).unwrap();
        let values: Vec<_> = nodes[0]
            .as_operator()
            .unwrap()
            .operands
            .iter()
            .map(|n| n.as_pattern().unwrap().value.clone())
            .collect();
        assert_eq!(values, vec![r#""foo"#, r#"bar""#]);
        let nodes = parse(r#""foo""#, SearchType::Literal).unwrap();
        let pattern = nodes[0].as_pattern().unwrap();
        assert_eq!(pattern.value, r#""foo""#);
        assert!(!pattern.labels().contains(Labels::QUOTED));
    }

    #[test]
    fn test_slash_is_literal_in_literal_search() {
        assert_eq!(parsed("/b.z/", SearchType::Literal), r#""/b.z/""#);
    }

    #[test]
    fn test_negation() {
        assert_eq!(standard("foo -bar"), r#"(concat "foo" "NOT bar")"#);
        assert_eq!(standard(r#"-"baz""#), r#""NOT baz""#);
        assert_eq!(standard("NOT repo:foo x"), r#"(and "-repo:foo" "x")"#);
        assert_eq!(standard("a - b"), r#"(concat "a" "-" "b")"#);
        assert_eq!(standard("(NOT x)"), r#""NOT x""#);
    }

    #[test]
    fn test_not_errors() {
        let err = parse("NOT (a or b)", SearchType::Standard).unwrap_err();
        assert_eq!(err.to_string(), NOT_EXPRESSION);
        let err = parse("NOT -repo:foo", SearchType::Standard).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"unexpected NOT before "-repo:foo". Remove NOT and try again"#
        );
    }

    #[test]
    fn test_trailing_not_is_dropped() {
        assert_eq!(standard("foo not "), r#""foo""#);
        assert_eq!(standard("foo NOT  "), r#""foo""#);
        assert_eq!(parsed("foo not ", SearchType::Regex), r#""foo""#);
    }

    #[test]
    fn test_field_values() {
        assert_eq!(standard(r#"repo:"foo bar""#), r#""repo:foo bar""#);
        assert_eq!(standard("(a repo:foo)"), r#"(and "repo:foo" "a")"#);
        assert_eq!(
            standard("repo:contains.file(path:a b) x"),
            r#"(and "repo:contains.file(path:a b)" "x")"#
        );
        let nodes = parse("repo:has.topic(go)", SearchType::Standard).unwrap();
        assert!(nodes[0].as_parameter().unwrap().annotation.labels.contains(Labels::IS_PREDICATE));
    }

    #[test]
    fn test_unterminated_field_value() {
        let err = parse(r#"repo:"foo"#, SearchType::Standard).unwrap_err();
        assert!(matches!(err, QueryError::Scan(_)));
    }

    #[test]
    fn test_hoist_applies_without_parens() {
        assert_eq!(
            standard("repo:foo a or b"),
            r#"(and "repo:foo" (or "a" "b"))"#
        );
    }

    #[test]
    fn test_regexp_stray_open_paren() {
        // The fallback reads the stray paren as text.
        assert_eq!(parsed("(foo", SearchType::Regex), r#""(foo""#);
    }

    #[test]
    fn test_partition_parameters() {
        let nodes = vec![
            Pattern::new("a", Labels::LITERAL, new_range(0, 1)).into(),
            Parameter::new("repo", "x").into(),
            Pattern::new("b", Labels::LITERAL, new_range(9, 10)).into(),
        ];
        assert_eq!(
            to_string(&partition_parameters(nodes)),
            r#"(and "repo:x" (concat "a" "b"))"#
        );
    }

    #[test]
    fn test_concat_patterns() {
        let left = Pattern::new("foo", Labels::LITERAL, new_range(0, 3));
        let right = Pattern::new(")", Labels::HEURISTIC_DANGLING_PARENS, new_range(3, 4));
        let joined = concat_patterns(left.clone(), right).unwrap();
        assert_eq!(joined.value, "foo)");
        assert_eq!(joined.annotation.range, new_range(0, 4));

        let far = Pattern::new(")", Labels::LITERAL, new_range(5, 6));
        assert!(matches!(concat_patterns(left, far), Err(QueryError::Unsupported(_))));
    }
}
