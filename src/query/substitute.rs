//! Expanding predicates and search contexts into concrete filters.
//!
//! Both substitutions call back into the caller, which owns the data needed
//! to resolve them, and rebuild a [`Plan`] from the rewritten tree.

use super::error::{QueryError, Result};
use super::fields::{FIELD_CONTEXT, FIELD_FILE, FIELD_REPO, Registry};
use super::labels::Labels;
use super::mapper::{map_field, map_parameters};
use super::planner::{Basic, Plan, build_plan};
use super::predicate::Predicate;
use super::transformer::init;
use super::types::{Node, OperatorKind, Parameter, SearchType, new_operator};

/// A result produced by evaluating a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateMatch {
    Repo { name: String },
    File { repo: String, path: String },
}

fn exact(value: &str) -> String {
    format!("^{}$", regex::escape(value))
}

fn parameter(field: &str, value: String, negated: bool) -> Node {
    Parameter {
        negated,
        ..Parameter::new(field, value)
    }
    .into()
}

/// Filters selecting exactly `matches`. Positive predicates become a
/// disjunction; negated ones exclude every match.
fn expand(matches: &[PredicateMatch], negated: bool) -> Vec<Node> {
    let nodes = matches
        .iter()
        .flat_map(|m| match m {
            PredicateMatch::Repo { name } => vec![parameter(FIELD_REPO, exact(name), negated)],
            PredicateMatch::File { repo, path } => new_operator(
                vec![
                    parameter(FIELD_REPO, exact(repo), false),
                    parameter(FIELD_FILE, exact(path), negated),
                ],
                OperatorKind::And,
            ),
        })
        .collect();
    let kind = if negated { OperatorKind::And } else { OperatorKind::Or };
    new_operator(nodes, kind)
}

/// Replaces every predicate parameter of `basic` with the filters returned by
/// `evaluate`.
///
/// Fails with [`QueryError::NoResults`] when a positive predicate matches
/// nothing, since the query then cannot match anything either. A negated
/// predicate without matches is dropped. Predicate names are resolved in
/// `registry`.
pub fn substitute_predicates(
    basic: Basic,
    registry: &Registry,
    mut evaluate: impl FnMut(&Predicate) -> Result<Vec<PredicateMatch>>,
) -> Result<Plan> {
    let mut error = None;
    let nodes = map_parameters(basic.to_parse_tree(), |p| {
        if !p.annotation.labels.contains(Labels::IS_PREDICATE) || error.is_some() {
            return Some(p.into());
        }
        let result = Predicate::parse(&p.field, &p.value, p.negated, registry)
            .and_then(|predicate| evaluate(&predicate).map(|matches| (predicate, matches)));
        match result {
            Ok((predicate, matches)) => {
                log::debug!(
                    "predicate {}:{} matched {} results",
                    predicate.field(),
                    predicate.name(),
                    matches.len()
                );
                if matches.is_empty() && !p.negated {
                    error = Some(QueryError::NoResults);
                    return None;
                }
                expand(&matches, p.negated).pop()
            }
            Err(err) => {
                error = Some(err);
                None
            }
        }
    });
    match error {
        Some(err) => Err(err),
        None => Ok(build_plan(nodes)),
    }
}

/// Replaces every `context:name` parameter with the query that `lookup`
/// returns for `name`, parsed with `search_type`. A lookup returning
/// `Ok(None)` keeps the parameter.
pub fn substitute_search_contexts(
    lookup: impl Fn(&str) -> Result<Option<String>>,
    nodes: Vec<Node>,
    search_type: SearchType,
) -> Result<Plan> {
    let mut error = None;
    let nodes = map_field(nodes, FIELD_CONTEXT, |p| {
        if error.is_some() {
            return Some(p.into());
        }
        let context_error = |msg: String| QueryError::SearchContext {
            name: p.value.clone(),
            msg,
        };
        if p.negated {
            error = Some(context_error("the context field cannot be negated".to_string()));
            return Some(p.into());
        }
        let query = match lookup(&p.value) {
            Ok(Some(query)) => query,
            Ok(None) => return Some(p.into()),
            Err(err) => {
                error = Some(context_error(err.to_string()));
                return Some(p.into());
            }
        };
        match init(&query, search_type)(Vec::new()) {
            Ok(context) => {
                log::debug!("expanded context:{} to {} nodes", p.value, context.len());
                new_operator(context, OperatorKind::And).pop()
            }
            Err(err) => {
                error = Some(context_error(err.to_string()));
                Some(p.into())
            }
        }
    });
    match error {
        Some(err) => Err(err),
        None => Ok(build_plan(nodes)),
    }
}
