//! Semantic checks on parsed queries.
//!
//! Validation stops at the first failure: a query is either accepted or
//! rejected with one message explaining why.

use regex::Regex;
use rustc_hash::FxHashSet;

use super::error::{QueryError, Result};
use super::fields::{
    COMMIT_FIELDS, FIELD_AFTER, FIELD_ARCHIVED, FIELD_AUTHOR, FIELD_BEFORE, FIELD_CASE, FIELD_COMMITTER,
    FIELD_CONTENT, FIELD_CONTEXT, FIELD_COUNT, FIELD_FILE, FIELD_FORK, FIELD_INDEX, FIELD_LANG, FIELD_MESSAGE,
    FIELD_PATTERN_TYPE, FIELD_REPO, FIELD_REPO_HAS_COMMIT_AFTER, FIELD_REPO_HAS_DESCRIPTION, FIELD_REPO_HAS_FILE,
    FIELD_REV, FIELD_SELECT, FIELD_TIMEOUT, FIELD_TYPE, FIELD_VISIBILITY, Registry,
};
use super::labels::Labels;
use super::planner::Plan;
use super::predicate::Predicate;
use super::select::SelectPath;
use super::types::{Node, Parameter, Pattern, SearchType};
use super::values::{YesNoOnly, lookup_language, parse_bool, parse_date, parse_duration, parse_yes_no_only};
use super::visitor::{Visitor, walk};

const SINGULAR_FIELDS: [&str; 13] = [
    FIELD_REPO_HAS_COMMIT_AFTER,
    FIELD_CASE,
    FIELD_FORK,
    FIELD_ARCHIVED,
    FIELD_INDEX,
    FIELD_PATTERN_TYPE,
    FIELD_VISIBILITY,
    FIELD_REV,
    FIELD_CONTEXT,
    FIELD_TIMEOUT,
    FIELD_COUNT,
    FIELD_SELECT,
    FIELD_CONTENT,
];

const UNNEGATABLE_FIELDS: [&str; 15] = [
    FIELD_REPO_HAS_COMMIT_AFTER,
    FIELD_CASE,
    FIELD_FORK,
    FIELD_ARCHIVED,
    FIELD_INDEX,
    FIELD_TYPE,
    FIELD_PATTERN_TYPE,
    FIELD_VISIBILITY,
    FIELD_REV,
    FIELD_CONTEXT,
    FIELD_TIMEOUT,
    FIELD_COUNT,
    FIELD_SELECT,
    FIELD_BEFORE,
    FIELD_AFTER,
];

const TYPES: [&str; 6] = ["commit", "diff", "symbol", "repo", "path", "file"];
const VISIBILITIES: [&str; 3] = ["any", "private", "public"];

/// Checks every parameter and pattern of `nodes`, then the rules that relate
/// fields to each other.
pub fn validate(nodes: &[Node], registry: &Registry) -> Result<()> {
    let mut checker = Checker {
        registry,
        seen: FxHashSet::default(),
        parameters: Vec::new(),
        negated_pattern: false,
        structural_pattern: false,
        error: None,
    };
    walk(&mut checker, nodes);
    if let Some(err) = checker.error {
        return Err(err);
    }
    checker.check_relations()
}

/// Validates every disjunct of `plan` on its own.
pub fn validate_plan(plan: &Plan, registry: &Registry) -> Result<()> {
    for basic in plan.iter() {
        validate(&basic.to_parse_tree(), registry)?;
    }
    Ok(())
}

struct Checker<'a> {
    registry: &'a Registry,
    seen: FxHashSet<&'static str>,
    parameters: Vec<Parameter>,
    negated_pattern: bool,
    structural_pattern: bool,
    error: Option<QueryError>,
}

impl Visitor for Checker<'_> {
    fn visit_parameter(&mut self, parameter: &Parameter) {
        if self.error.is_none() {
            self.error = self.check_parameter(parameter).err();
            self.parameters.push(parameter.clone());
        }
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        if self.error.is_none() {
            self.error = check_pattern(pattern).err();
            self.negated_pattern |= pattern.negated;
            self.structural_pattern |= pattern.labels().contains(Labels::STRUCTURAL);
        }
    }
}

fn check_regex(value: &str) -> Result<()> {
    Regex::new(value)
        .map(|_| ())
        .map_err(|e| QueryError::validation(format!("invalid regular expression {value:?}: {e}")))
}

fn check_pattern(pattern: &Pattern) -> Result<()> {
    if pattern.labels().contains(Labels::REGEXP) {
        check_regex(&pattern.value)?;
    }
    Ok(())
}

fn one_of(field: &str, value: &str, valid: &[&str]) -> Result<()> {
    if valid.contains(&value.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(QueryError::validation(format!(
            "invalid value {value:?} for field {field:?}. Valid values are: {}",
            valid.join(", ")
        )))
    }
}

impl Checker<'_> {
    fn check_parameter(&mut self, p: &Parameter) -> Result<()> {
        let Some(field) = self.registry.canonical(&p.field) else {
            return Err(QueryError::validation(format!(
                "field {:?} is not a valid search field",
                p.field
            )));
        };

        if SINGULAR_FIELDS.contains(&field) && !self.seen.insert(field) {
            return Err(QueryError::validation(format!(
                "field {field:?} may not be used more than once"
            )));
        }
        if p.negated && UNNEGATABLE_FIELDS.contains(&field) {
            return Err(QueryError::validation(format!(
                "field {field:?} does not support negation"
            )));
        }

        if p.annotation.labels.contains(Labels::IS_PREDICATE) {
            Predicate::parse(field, &p.value, p.negated, self.registry)?;
            return Ok(());
        }

        let value = p.value.as_str();
        match field {
            FIELD_REPO => check_regex(value.split_once('@').map_or(value, |(name, _)| name)),
            FIELD_REPO_HAS_FILE | FIELD_FILE | FIELD_AUTHOR | FIELD_COMMITTER | FIELD_MESSAGE
            | FIELD_REPO_HAS_DESCRIPTION => check_regex(value),
            FIELD_CASE => parse_bool(value).map(|_| ()),
            FIELD_FORK | FIELD_ARCHIVED | FIELD_INDEX => parse_yes_no_only(value).map(|_| ()).ok_or_else(|| {
                QueryError::validation(format!(
                    "invalid value {value:?} for field {field:?}. Valid values are: yes, only, no"
                ))
            }),
            FIELD_LANG => lookup_language(value)
                .map(|_| ())
                .ok_or_else(|| QueryError::validation(format!("unknown language: {value:?}"))),
            FIELD_TYPE => one_of(field, value, &TYPES),
            FIELD_PATTERN_TYPE => value.parse::<SearchType>().map(|_| ()),
            FIELD_VISIBILITY => one_of(field, value, &VISIBILITIES),
            FIELD_COUNT => value.parse::<u32>().map(|_| ()).map_err(|_| {
                QueryError::validation(format!("field \"count\" has value {value:?}, expected a number"))
            }),
            FIELD_TIMEOUT => parse_duration(value).map(|_| ()),
            FIELD_BEFORE | FIELD_AFTER => parse_date(value).map(|_| ()),
            FIELD_SELECT => SelectPath::parse(value).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn has_type(&self, types: &[&str]) -> bool {
        self.parameters
            .iter()
            .any(|p| p.field == FIELD_TYPE && types.iter().any(|t| p.value.eq_ignore_ascii_case(t)))
    }

    fn values(&self, field: &str) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.field == field)
    }

    fn check_relations(&self) -> Result<()> {
        self.check_rev()?;

        if let Some(p) = self
            .parameters
            .iter()
            .find(|p| COMMIT_FIELDS.contains(&p.field.as_str()))
        {
            if !self.has_type(&["commit", "diff"]) {
                return Err(QueryError::validation(format!(
                    "your query contains the field '{}', which requires type:commit or type:diff in the query",
                    p.field
                )));
            }
        }

        if self.values(FIELD_REPO_HAS_FILE).next().is_some() && self.has_type(&["symbol"]) {
            return Err(QueryError::validation(
                "repohasfile is not compatible with type:symbol",
            ));
        }

        let structural = self.structural_pattern
            || self
                .values(FIELD_PATTERN_TYPE)
                .any(|p| p.value.eq_ignore_ascii_case("structural"));
        if structural {
            if self.values(FIELD_TYPE).next().is_some() {
                return Err(QueryError::validation(
                    "the parameter type: is not valid for structural search",
                ));
            }
            if self.negated_pattern {
                return Err(QueryError::validation(
                    "the query contains a negated search pattern. Structural search does not support negated search patterns at the moment",
                ));
            }
        }

        self.check_index_only()
    }

    fn check_rev(&self) -> Result<()> {
        if self.values(FIELD_REV).next().is_none() {
            return Ok(());
        }
        let repos: Vec<&Parameter> = self
            .values(FIELD_REPO)
            .filter(|p| !p.negated && !p.annotation.labels.contains(Labels::IS_PREDICATE))
            .collect();
        if repos.is_empty() || repos.iter().all(|p| p.value.is_empty()) {
            return Err(QueryError::validation(
                "invalid syntax. The query contains `rev:` without `repo:`. Add a `repo:` filter and try again",
            ));
        }
        if repos.iter().any(|p| p.value.contains('@')) {
            return Err(QueryError::validation(
                "invalid syntax. You specified both @ and rev: for a repo: filter and I don't know how to interpret this. Remove either @ or rev: and try again",
            ));
        }
        Ok(())
    }

    /// Revisions given as ref globs must be resolved against the repository,
    /// which the index cannot do.
    fn check_index_only(&self) -> Result<()> {
        let index_only = self
            .values(FIELD_INDEX)
            .any(|p| parse_yes_no_only(&p.value) == Some(YesNoOnly::Only));
        if !index_only {
            return Ok(());
        }
        let revs = self.values(FIELD_REV).map(|p| p.value.as_str()).chain(
            self.values(FIELD_REPO)
                .filter_map(|p| p.value.split_once('@').map(|(_, rev)| rev)),
        );
        for rev in revs {
            if rev.split(':').any(|r| r.starts_with('*')) {
                return Err(QueryError::validation(format!(
                    "invalid index:only (revision {rev:?} is a glob pattern, which cannot be resolved for indexed search)"
                )));
            }
        }
        Ok(())
    }
}
