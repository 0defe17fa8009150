//! Hoisting scope parameters out of an unparenthesized expression.
//!
//! Without parentheses, `repo:foo a or b` parses as `(repo:foo a) or b`,
//! while users mean `repo:foo (a or b)`. When the parameters sit only at the
//! outer edges of the expression, [`hoist`] moves them out and regroups the
//! patterns under the operator.

use std::slice;

use super::error::{Result, UnsupportedError};
use super::labels::Labels;
use super::mapper::map_patterns;
use super::types::{Node, OperatorKind, Parameter, is_pattern_expression, new_operator, partition_search_pattern};

fn unsupported(msg: &str) -> super::error::QueryError {
    UnsupportedError::new(format!("heuristic hoist: {msg}")).into()
}

/// Parameters of `operand` all precede its pattern.
fn naturally_ordered(parameters: &[Parameter], pattern: &Node) -> bool {
    let start = pattern.range().start.column;
    parameters.iter().all(|p| p.annotation.range.end.column <= start)
}

/// The pattern of `operand` precedes all its parameters.
fn reverse_ordered(parameters: &[Parameter], pattern: &Node) -> bool {
    let end = pattern.range().end.column;
    parameters.iter().all(|p| p.annotation.range.start.column >= end)
}

fn label_hoisted(node: Node) -> Vec<Node> {
    map_patterns(vec![node], |mut p| {
        p.annotation.labels |= Labels::HEURISTIC_HOISTED;
        Some(p.into())
    })
}

/// Rewrites `params1 a OP b OP ... OP z params2` into
/// `params1 params2 (a OP b OP ... OP z)`.
///
/// Fails unless `nodes` is a single `and` or `or` operator whose inner
/// operands are pure pattern expressions and whose first and last operands
/// keep their parameters on the outside.
pub fn hoist(nodes: &[Node]) -> Result<Vec<Node>> {
    let [Node::Operator(op)] = nodes else {
        return Err(unsupported("expected a single expression"));
    };
    if op.kind == OperatorKind::Concat {
        return Err(unsupported("cannot hoist a concatenation"));
    }
    let [first, middle @ .., last] = op.operands.as_slice() else {
        return Err(unsupported("expected at least two operands"));
    };

    let (mut parameters, first_pattern) = partition_search_pattern(slice::from_ref(first))?;
    let first_pattern = first_pattern.ok_or_else(|| unsupported("first operand has no pattern"))?;
    if !naturally_ordered(&parameters, &first_pattern) {
        return Err(unsupported("parameters of the first operand follow its pattern"));
    }

    if !middle.iter().all(|node| is_pattern_expression(slice::from_ref(node))) {
        return Err(unsupported("inner operands must be patterns"));
    }

    let (last_parameters, last_pattern) = partition_search_pattern(slice::from_ref(last))?;
    let last_pattern = last_pattern.ok_or_else(|| unsupported("last operand has no pattern"))?;
    if !reverse_ordered(&last_parameters, &last_pattern) {
        return Err(unsupported("parameters of the last operand precede its pattern"));
    }

    parameters.extend(last_parameters);
    if parameters.is_empty() {
        return Err(unsupported("no parameters to hoist"));
    }

    let mut patterns = label_hoisted(first_pattern);
    for node in middle {
        patterns.extend(label_hoisted(node.clone()));
    }
    patterns.extend(label_hoisted(last_pattern));

    log::debug!("hoisted {} parameters out of {} expression", parameters.len(), op.kind.as_str());
    let mut result: Vec<Node> = parameters.into_iter().map(Node::from).collect();
    result.extend(new_operator(patterns, op.kind));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::to_string;
    use crate::query::{SearchType, parse};

    fn hoisted(input: &str) -> String {
        to_string(&parse(input, SearchType::Standard).unwrap())
    }

    #[test]
    fn test_hoist_or() {
        assert_eq!(
            hoisted("repo:foo a or b file:bar"),
            r#"(and "repo:foo" "file:bar" (or "a" "b"))"#
        );
    }

    #[test]
    fn test_hoist_and_with_middle_operands() {
        assert_eq!(
            hoisted("repo:foo a and b and c"),
            r#"(and "repo:foo" "a" "b" "c")"#
        );
        assert_eq!(
            hoisted("repo:foo a or b or c"),
            r#"(and "repo:foo" (or "a" "b" "c"))"#
        );
    }

    #[test]
    fn test_hoist_labels_moved_patterns() {
        let nodes = parse("repo:foo a or b", SearchType::Standard).unwrap();
        let or = nodes[0].as_operator().unwrap().operands[1].as_operator().unwrap();
        for operand in &or.operands {
            assert!(operand.as_pattern().unwrap().labels().contains(Labels::HEURISTIC_HOISTED));
        }
    }

    #[test]
    fn test_no_hoist_when_parameter_in_the_middle() {
        assert_eq!(
            hoisted("repo:a a or repo:b b"),
            r#"(or (and "repo:a" "a") (and "repo:b" "b"))"#
        );
    }

    #[test]
    fn test_no_hoist_when_first_operand_is_reordered() {
        assert_eq!(
            hoisted("a repo:foo or b"),
            r#"(or (and "repo:foo" "a") "b")"#
        );
    }

    #[test]
    fn test_hoist_rejects_other_shapes() {
        let nodes = parse("a b", SearchType::Standard).unwrap();
        assert!(hoist(&nodes).is_err());
        assert!(hoist(&[]).is_err());
    }
}
