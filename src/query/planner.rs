//! Query planning: turning a query tree into independent basic queries.
//!
//! A [`Plan`] is a disjunction of [`Basic`] queries. Each basic query is a
//! flat list of scope parameters and at most one pattern expression, so the
//! search backend can run every disjunct on its own. Only `or` expressions
//! that involve parameters are distributed; an `or` between patterns stays in
//! the pattern of a single basic query.

use std::ops::Deref;
use std::slice;

use super::error::{QueryError, Result};
use super::fields::{FIELD_CASE, FIELD_COUNT, FIELD_INDEX, FIELD_PATTERN_TYPE, FIELD_REPO};
use super::labels::Labels;
use super::types::{Node, OperatorKind, Parameter, is_pattern_expression, new_operator, partition_search_pattern};
use super::values::{YesNoOnly, parse_bool, parse_yes_no_only};
use super::visitor::visit_patterns;

/// One disjunct of a plan: scope parameters and a parameter-free pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Basic {
    pub parameters: Vec<Parameter>,
    pub pattern: Option<Node>,
}

impl Basic {
    /// Splits a flat query into parameters and pattern. Fails when a
    /// parameter is nested inside an operator.
    pub fn from_nodes(nodes: &[Node]) -> Result<Self> {
        let (parameters, pattern) = partition_search_pattern(nodes)?;
        Ok(Self { parameters, pattern })
    }

    pub fn to_parse_tree(&self) -> Vec<Node> {
        let nodes = self
            .parameters
            .iter()
            .cloned()
            .map(Node::from)
            .chain(self.pattern.clone())
            .collect();
        new_operator(nodes, OperatorKind::And)
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.pattern.is_none()
    }

    /// Value of the first positive parameter for `field`.
    pub fn find_value(&self, field: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.field == field && !p.negated)
            .map(|p| p.value.as_str())
    }

    /// Values of all positive parameters for `field`.
    pub fn values(&self, field: &str) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.field == field && !p.negated)
            .map(|p| p.value.as_str())
            .collect()
    }

    /// Included and excluded repository patterns. Predicates are skipped.
    pub fn repo_values(&self) -> (Vec<&str>, Vec<&str>) {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for p in &self.parameters {
            if p.field != FIELD_REPO || p.annotation.labels.contains(Labels::IS_PREDICATE) {
                continue;
            }
            if p.negated {
                exclude.push(p.value.as_str());
            } else {
                include.push(p.value.as_str());
            }
        }
        (include, exclude)
    }

    pub fn yes_no_only(&self, field: &str) -> Option<YesNoOnly> {
        self.find_value(field).and_then(parse_yes_no_only)
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.find_value(FIELD_CASE)
            .and_then(|v| parse_bool(v).ok())
            .unwrap_or(false)
    }

    pub fn count(&self) -> Option<usize> {
        self.find_value(FIELD_COUNT).and_then(|v| v.parse().ok())
    }

    /// Whether indexed search may be used. Defaults to [`YesNoOnly::Yes`].
    pub fn index(&self) -> YesNoOnly {
        self.yes_no_only(FIELD_INDEX).unwrap_or(YesNoOnly::Yes)
    }

    pub fn is_structural(&self) -> bool {
        if self
            .find_value(FIELD_PATTERN_TYPE)
            .is_some_and(|v| v.eq_ignore_ascii_case("structural"))
        {
            return true;
        }
        let mut structural = false;
        if let Some(pattern) = &self.pattern {
            visit_patterns(slice::from_ref(pattern), |p| {
                structural |= p.labels().contains(Labels::STRUCTURAL);
            });
        }
        structural
    }

    /// Rewrites or drops parameters, keeping the pattern.
    pub fn map_parameters(self, f: impl FnMut(Parameter) -> Option<Parameter>) -> Self {
        Self {
            parameters: self.parameters.into_iter().filter_map(f).collect(),
            pattern: self.pattern,
        }
    }
}

/// A disjunction of basic queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan(Vec<Basic>);

impl Plan {
    pub fn new(basics: Vec<Basic>) -> Self {
        Self(basics)
    }

    /// The only basic query of the plan, for callers that cannot run more
    /// than one.
    pub fn single(&self) -> Result<&Basic> {
        match self.0.as_slice() {
            [basic] => Ok(basic),
            _ => Err(QueryError::QueryNotSupported),
        }
    }

    pub fn to_parse_tree(&self) -> Vec<Node> {
        let disjuncts = self.0.iter().flat_map(Basic::to_parse_tree).collect();
        new_operator(disjuncts, OperatorKind::Or)
    }

    pub fn into_basics(self) -> Vec<Basic> {
        self.0
    }
}

impl Deref for Plan {
    type Target = [Basic];

    fn deref(&self) -> &[Basic] {
        &self.0
    }
}

impl IntoIterator for Plan {
    type Item = Basic;
    type IntoIter = std::vec::IntoIter<Basic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Basic> for Plan {
    fn from_iter<I: IntoIterator<Item = Basic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn build_plan(nodes: Vec<Node>) -> Plan {
    Plan(distribute(vec![Basic::default()], nodes))
}

pub fn map_plan(plan: Plan, f: impl Fn(Basic) -> Basic) -> Plan {
    plan.into_iter().map(f).collect()
}

/// Combines two basic queries: parameters are appended and patterns joined
/// with `and`.
pub fn conjunction(left: Basic, right: Basic) -> Basic {
    let mut parameters = left.parameters;
    parameters.extend(right.parameters);
    let pattern = match (left.pattern, right.pattern) {
        (Some(l), Some(r)) => new_operator(vec![l, r], OperatorKind::And).into_iter().next(),
        (l, r) => l.or(r),
    };
    Basic { parameters, pattern }
}

/// Adds `node` to every prefix.
pub fn product(prefixes: Vec<Basic>, node: Node) -> Vec<Basic> {
    let basic = match node {
        Node::Parameter(p) => Basic {
            parameters: vec![p],
            pattern: None,
        },
        node => Basic {
            parameters: Vec::new(),
            pattern: Some(node),
        },
    };
    prefixes
        .into_iter()
        .map(|prefix| conjunction(prefix, basic.clone()))
        .collect()
}

/// Distributes `nodes` over `prefixes`. `and` folds its operands into the
/// same prefixes while `or` branches every prefix once per operand.
pub fn distribute(mut prefixes: Vec<Basic>, nodes: Vec<Node>) -> Vec<Basic> {
    for node in nodes {
        if is_pattern_expression(slice::from_ref(&node)) {
            prefixes = product(prefixes, node);
            continue;
        }
        match node {
            Node::Operator(op) if op.kind == OperatorKind::Or => {
                let mut result = Vec::with_capacity(prefixes.len() * op.operands.len());
                for operand in op.operands {
                    let branches = distribute(vec![Basic::default()], vec![operand]);
                    for prefix in &prefixes {
                        for branch in &branches {
                            result.push(conjunction(prefix.clone(), branch.clone()));
                        }
                    }
                }
                prefixes = result;
            }
            Node::Operator(op) => prefixes = distribute(prefixes, op.operands),
            leaf => prefixes = product(prefixes, leaf),
        }
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::to_string;
    use crate::query::{SearchType, parse};

    fn plan_of(input: &str) -> Vec<String> {
        let nodes = parse(input, SearchType::Standard).unwrap();
        build_plan(nodes)
            .iter()
            .map(|basic| to_string(&basic.to_parse_tree()))
            .collect()
    }

    #[test]
    fn test_single_basic() {
        assert_eq!(plan_of("repo:foo bar"), vec![r#"(and "repo:foo" "bar")"#]);
    }

    #[test]
    fn test_empty_query_has_one_empty_basic() {
        let plan = build_plan(Vec::new());
        assert_eq!(plan.len(), 1);
        assert!(plan[0].is_empty());
    }

    #[test]
    fn test_parameter_disjunction_is_distributed() {
        assert_eq!(
            plan_of("(repo:a or repo:b) (file:x or file:y)"),
            vec![
                r#"(and "repo:a" "file:x")"#,
                r#"(and "repo:b" "file:x")"#,
                r#"(and "repo:a" "file:y")"#,
                r#"(and "repo:b" "file:y")"#,
            ]
        );
    }

    #[test]
    fn test_pattern_disjunction_stays_in_pattern() {
        assert_eq!(
            plan_of("(repo:a or repo:b) (x or y)"),
            vec![
                r#"(and "repo:a" (or "x" "y"))"#,
                r#"(and "repo:b" (or "x" "y"))"#,
            ]
        );
    }

    #[test]
    fn test_disjunction_of_scoped_queries() {
        assert_eq!(
            plan_of("(repo:a x) or (repo:b y)"),
            vec![r#"(and "repo:a" "x")"#, r#"(and "repo:b" "y")"#]
        );
    }

    #[test]
    fn test_conjunction() {
        let left = Basic {
            parameters: vec![Parameter::new("repo", "a")],
            pattern: None,
        };
        let right = Basic {
            parameters: vec![Parameter::new("file", "b")],
            pattern: parse("x", SearchType::Standard).unwrap().pop(),
        };
        let both = conjunction(left, right);
        assert_eq!(both.parameters.len(), 2);
        assert_eq!(to_string(&both.to_parse_tree()), r#"(and "repo:a" "file:b" "x")"#);
    }

    #[test]
    fn test_single() {
        let nodes = parse("(repo:a or repo:b) x", SearchType::Standard).unwrap();
        let plan = build_plan(nodes);
        assert!(matches!(plan.single(), Err(QueryError::QueryNotSupported)));
        assert!(build_plan(parse("x", SearchType::Standard).unwrap()).single().is_ok());
    }

    #[test]
    fn test_plan_to_parse_tree() {
        let plan = build_plan(parse("(repo:a x) or (repo:b y)", SearchType::Standard).unwrap());
        assert_eq!(
            to_string(&plan.to_parse_tree()),
            r#"(or (and "repo:a" "x") (and "repo:b" "y"))"#
        );
    }

    #[test]
    fn test_basic_accessors() {
        let nodes = parse("repo:a -repo:b case:yes count:10 index:only x", SearchType::Standard).unwrap();
        let basic = Basic::from_nodes(&nodes).unwrap();
        assert_eq!(basic.repo_values(), (vec!["a"], vec!["b"]));
        assert!(basic.is_case_sensitive());
        assert_eq!(basic.count(), Some(10));
        assert_eq!(basic.index(), YesNoOnly::Only);
        assert_eq!(basic.find_value("repo"), Some("a"));
        assert!(!basic.is_structural());
    }

    #[test]
    fn test_map_parameters() {
        let nodes = parse("repo:a file:b x", SearchType::Standard).unwrap();
        let basic = Basic::from_nodes(&nodes)
            .unwrap()
            .map_parameters(|p| (p.field != "file").then_some(p));
        assert_eq!(to_string(&basic.to_parse_tree()), r#"(and "repo:a" "x")"#);
    }
}
