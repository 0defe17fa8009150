//! Composable rewrite steps from raw input to a validated [`Plan`].
//!
//! A [`Step`] maps a node list to a new node list and may fail. [`init`]
//! parses the input and applies the normalizations for a search type;
//! [`pipeline`] runs steps from an empty seed and turns the result into a
//! plan.

use std::mem;
use std::sync::LazyLock;

use globset::Glob;
use regex::Regex;

use super::error::{QueryError, Result};
use super::fields::{FIELD_CONTENT, FIELD_COUNT, FIELD_FILE, FIELD_REPO, FIELD_REPO_HAS_FILE, FIELD_REV, Registry};
use super::labels::Labels;
use super::mapper::{map_field, map_parameters, map_patterns};
use super::parser::{ParserOptions, parse_with};
use super::planner::{Basic, Plan, build_plan, map_plan};
use super::types::{Annotation, Node, OperatorKind, Pattern, SearchType, new_operator};
use super::validate::validate_plan;

pub type Step = Box<dyn Fn(Vec<Node>) -> Result<Vec<Node>>>;

/// An infallible rewrite.
pub type Pass = Box<dyn Fn(Vec<Node>) -> Vec<Node>>;

/// Runs `steps` in order, stopping at the first error.
pub fn sequence(steps: Vec<Step>) -> Step {
    Box::new(move |nodes| steps.iter().try_fold(nodes, |nodes, step| step(nodes)))
}

/// Lifts infallible passes into a step.
pub fn succeeds(passes: Vec<Pass>) -> Step {
    Box::new(move |nodes| Ok(passes.iter().fold(nodes, |nodes, pass| pass(nodes))))
}

/// Parses `input` and applies the rewrites for `search_type`.
pub fn init(input: &str, search_type: SearchType) -> Step {
    init_with(input, ParserOptions { search_type, globbing: false })
}

pub fn init_with(input: &str, options: ParserOptions) -> Step {
    init_with_registry(input, options, Registry::standard())
}

/// Like [`init_with`], reading fields and predicates from `registry`.
pub fn init_with_registry(input: &str, options: ParserOptions, registry: &'static Registry) -> Step {
    let input = input.to_string();
    let search_type = detect_search_type(&input, options.search_type);
    let parse_step: Step = Box::new(move |_| parse_with(&input, search_type, registry));

    let mut steps = vec![parse_step, for_search_type_with(search_type, registry)];
    if options.globbing {
        steps.push(Box::new(globs_to_regexps));
    }
    sequence(steps)
}

static PATTERN_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)patterntype:(\w+)").unwrap());

/// Returns the search type named by a `patterntype:` parameter in `input`,
/// or `default` when there is none or it is not recognized.
pub fn detect_search_type(input: &str, default: SearchType) -> SearchType {
    PATTERN_TYPE
        .captures(input)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(default)
}

/// The normalizations every query goes through, followed by the
/// pattern-merging rules of `search_type`.
pub fn for_search_type(search_type: SearchType) -> Step {
    for_search_type_with(search_type, Registry::standard())
}

pub fn for_search_type_with(search_type: SearchType, registry: &'static Registry) -> Step {
    let mut passes: Vec<Pass> = vec![
        Box::new(lowercase_field_names),
        Box::new(move |nodes| substitute_aliases(nodes, search_type, registry)),
        Box::new(substitute_count_all),
    ];
    match search_type {
        SearchType::Literal => passes.push(Box::new(|nodes| substitute_concat(nodes, &space))),
        SearchType::Standard | SearchType::Lucky | SearchType::Keyword => {
            passes.push(Box::new(|nodes| substitute_concat(nodes, &standard)))
        }
        SearchType::Regex => {
            passes.push(Box::new(escape_parens_heuristic));
            passes.push(Box::new(|nodes| substitute_concat(nodes, &fuzzy_regexp)));
        }
        SearchType::Structural => {
            passes.push(Box::new(label_structural));
            passes.push(Box::new(ellipses_for_holes));
            passes.push(Box::new(|nodes| substitute_concat(nodes, &space)));
        }
    }
    succeeds(passes)
}

/// Runs `steps` from an empty seed, builds a plan, validates every disjunct
/// and attaches `rev:` values to repositories.
pub fn pipeline(steps: Vec<Step>) -> Result<Plan> {
    pipeline_with(steps, Registry::standard())
}

/// Like [`pipeline`], validating against `registry`.
pub fn pipeline_with(steps: Vec<Step>, registry: &Registry) -> Result<Plan> {
    let nodes = sequence(steps)(Vec::new())?;
    let plan = build_plan(nodes);
    log::debug!("plan has {} basic queries", plan.len());
    validate_plan(&plan, registry)?;
    Ok(map_plan(plan, concat_rev_filters))
}

pub fn lowercase_field_names(nodes: Vec<Node>) -> Vec<Node> {
    map_parameters(nodes, |mut p| {
        p.field = p.field.to_lowercase();
        Some(p.into())
    })
}

/// Resolves field aliases. `content:` becomes a pattern.
pub fn substitute_aliases(nodes: Vec<Node>, search_type: SearchType, registry: &Registry) -> Vec<Node> {
    map_parameters(nodes, |mut p| {
        if let Some(canonical) = registry.canonical(&p.field) {
            p.field = canonical.to_string();
        }
        if p.field != FIELD_CONTENT {
            return Some(p.into());
        }
        let kind = if search_type == SearchType::Regex {
            Labels::REGEXP
        } else {
            Labels::LITERAL
        };
        let labels = kind | Labels::IS_ALIAS | (p.annotation.labels & Labels::QUOTED);
        Some(
            Pattern {
                value: p.value,
                negated: p.negated,
                annotation: Annotation::new(labels, p.annotation.range),
            }
            .into(),
        )
    })
}

pub fn substitute_count_all(nodes: Vec<Node>) -> Vec<Node> {
    map_field(nodes, FIELD_COUNT, |mut p| {
        if p.value.eq_ignore_ascii_case("all") {
            p.value = "99999999".to_string();
        }
        Some(p.into())
    })
}

/// Replaces every concatenation with an `and` of merged pattern runs. Runs of
/// adjacent non-negated patterns go through `join`; other operands are kept
/// and rewritten recursively.
pub fn substitute_concat(nodes: Vec<Node>, join: &dyn Fn(Vec<Pattern>) -> Vec<Node>) -> Vec<Node> {
    let mut result = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Operator(op) if op.kind == OperatorKind::Concat => {
                let mut merged = Vec::new();
                let mut run = Vec::new();
                for operand in op.operands {
                    match operand {
                        Node::Pattern(p) if !p.negated => run.push(p),
                        other => {
                            if !run.is_empty() {
                                merged.extend(join(mem::take(&mut run)));
                            }
                            merged.extend(substitute_concat(vec![other], join));
                        }
                    }
                }
                if !run.is_empty() {
                    merged.extend(join(run));
                }
                result.extend(new_operator(merged, OperatorKind::And));
            }
            Node::Operator(op) => {
                result.extend(new_operator(substitute_concat(op.operands, join), op.kind));
            }
            leaf => result.push(leaf),
        }
    }
    result
}

/// Joins patterns with single spaces, keeping the labels of the first.
pub fn space(patterns: Vec<Pattern>) -> Vec<Node> {
    let Some(first) = patterns.first() else {
        return Vec::new();
    };
    let mut annotation = first.annotation;
    if let Some(last) = patterns.last() {
        annotation.range.end = last.annotation.range.end;
    }
    let value = patterns.iter().map(|p| p.value.as_str()).collect::<Vec<_>>().join(" ");
    vec![Pattern { value, negated: false, annotation }.into()]
}

/// Like [`space`], but regexp patterns split the run and pass through as-is.
pub fn standard(patterns: Vec<Pattern>) -> Vec<Node> {
    let mut result = Vec::new();
    let mut run = Vec::new();
    for pattern in patterns {
        if pattern.labels().contains(Labels::REGEXP) {
            result.extend(space(mem::take(&mut run)));
            result.push(pattern.into());
        } else {
            run.push(pattern);
        }
    }
    result.extend(space(run));
    result
}

/// Joins patterns into one regexp matching them in order on a line.
/// Literal patterns are escaped first.
pub fn fuzzy_regexp(patterns: Vec<Pattern>) -> Vec<Node> {
    if patterns.len() < 2 {
        return patterns.into_iter().map(Node::from).collect();
    }
    let mut annotation = patterns[0].annotation;
    if let Some(last) = patterns.last() {
        annotation.range.end = last.annotation.range.end;
    }
    annotation.labels = (annotation.labels - Labels::LITERAL - Labels::QUOTED) | Labels::REGEXP;

    let value = patterns
        .iter()
        .map(|p| {
            if p.labels().contains(Labels::LITERAL) {
                format!("(?:{})", regex::escape(&p.value))
            } else {
                format!("(?:{})", p.value)
            }
        })
        .collect::<Vec<_>>()
        .join(".*?");
    vec![Pattern { value, negated: false, annotation }.into()]
}

static EMPTY_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\s*)\)").unwrap());

/// Escapes every parenthesis not already escaped.
fn escape_parens(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                result.push(c);
                if let Some(escaped) = chars.next() {
                    result.push(escaped);
                }
            }
            '(' | ')' => {
                result.push('\\');
                result.push(c);
            }
            c => result.push(c),
        }
    }
    result
}

/// For regexp patterns, reads empty groups like `foo()` as literal
/// parentheses, and escapes every paren of patterns that only parsed by
/// reading stray parentheses as text.
pub fn escape_parens_heuristic(nodes: Vec<Node>) -> Vec<Node> {
    map_patterns(nodes, |mut p| {
        if p.labels().contains(Labels::LITERAL) {
            return Some(p.into());
        }
        if p.labels().contains(Labels::HEURISTIC_DANGLING_PARENS) {
            p.value = escape_parens(&p.value);
        } else if EMPTY_GROUP.is_match(&p.value) {
            p.value = EMPTY_GROUP.replace_all(&p.value, r"\(${1}\)").into_owned();
        }
        Some(p.into())
    })
}

pub fn label_structural(nodes: Vec<Node>) -> Vec<Node> {
    map_patterns(nodes, |mut p| {
        if p.labels().contains(Labels::LITERAL) {
            p.annotation.labels = (p.annotation.labels - Labels::LITERAL) | Labels::STRUCTURAL;
        }
        Some(p.into())
    })
}

/// Replaces `...` with the structural hole `:[_]`.
pub fn ellipses_for_holes(nodes: Vec<Node>) -> Vec<Node> {
    map_patterns(nodes, |mut p| {
        if p.labels().contains(Labels::STRUCTURAL) {
            p.value = p.value.replace("...", ":[_]");
        }
        Some(p.into())
    })
}

fn glob_to_regex(glob: &str) -> std::result::Result<String, globset::Error> {
    let glob = Glob::new(glob)?;
    let regex = glob.regex();
    Ok(regex.strip_prefix("(?-u)").unwrap_or(regex).to_string())
}

/// Translates glob syntax in `repo:`, `file:` and `repohasfile:` values to
/// regular expressions. A `@revision` suffix on repositories is kept.
pub fn globs_to_regexps(nodes: Vec<Node>) -> Result<Vec<Node>> {
    let mut error = None;
    let nodes = map_parameters(nodes, |mut p| {
        let globbed = [FIELD_REPO, FIELD_FILE, FIELD_REPO_HAS_FILE].contains(&p.field.as_str());
        if !globbed || p.annotation.labels.contains(Labels::IS_PREDICATE) || error.is_some() {
            return Some(p.into());
        }
        let (name, rev) = match p.value.split_once('@') {
            Some((name, rev)) if p.field == FIELD_REPO => (name.to_string(), Some(rev.to_string())),
            _ => (p.value.clone(), None),
        };
        match glob_to_regex(&name) {
            Ok(regex) => {
                p.value = match rev {
                    Some(rev) => format!("{regex}@{rev}"),
                    None => regex,
                };
            }
            Err(e) => {
                error = Some(QueryError::validation(format!(
                    "invalid glob syntax in field {}: {e}",
                    p.field
                )));
            }
        }
        Some(p.into())
    });
    match error {
        Some(err) => Err(err),
        None => Ok(nodes),
    }
}

/// Folds a single `rev:` value into every positive repository filter as
/// `repo@rev`. Basics with zero or several revisions are left alone.
pub fn concat_rev_filters(basic: Basic) -> Basic {
    let revs: Vec<String> = basic
        .parameters
        .iter()
        .filter(|p| p.field == FIELD_REV)
        .map(|p| p.value.clone())
        .collect();
    let [rev] = revs.as_slice() else {
        return basic;
    };

    let parameters = basic
        .parameters
        .into_iter()
        .filter(|p| p.field != FIELD_REV)
        .map(|mut p| {
            let attachable = p.field == FIELD_REPO
                && !p.negated
                && !p.annotation.labels.contains(Labels::IS_PREDICATE)
                && !p.value.contains('@');
            if attachable {
                p.value = format!("{}@{rev}", p.value);
            }
            p
        })
        .collect();
    Basic { parameters, ..basic }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::predicate::{PredicateKind, PredicateRegistry};
    use crate::query::types::to_string;

    fn run(input: &str, search_type: SearchType) -> String {
        let nodes = init(input, search_type)(Vec::new()).unwrap();
        to_string(&nodes)
    }

    #[test]
    fn test_count_all() {
        assert_eq!(run("foo count:all", SearchType::Standard), r#"(and "count:99999999" "foo")"#);
        assert_eq!(run("count:ALL", SearchType::Standard), r#""count:99999999""#);
    }

    #[test]
    fn test_aliases_and_lowercase_fields() {
        assert_eq!(run("R:foo LANGUAGE:go x", SearchType::Standard), r#"(and "repo:foo" "lang:go" "x")"#);
    }

    #[test]
    fn test_content_becomes_pattern() {
        let nodes = init(r#"content:"a b" repo:x"#, SearchType::Regex)(Vec::new()).unwrap();
        let and = nodes[0].as_operator().unwrap();
        let pattern = and.operands.iter().find_map(Node::as_pattern).unwrap();
        assert_eq!(pattern.value, "a b");
        assert!(pattern.labels().contains(Labels::IS_ALIAS | Labels::REGEXP | Labels::QUOTED));
    }

    #[test]
    fn test_literal_space_join() {
        assert_eq!(run("repo:a foo  bar baz", SearchType::Literal), r#"(and "repo:a" "foo bar baz")"#);
    }

    #[test]
    fn test_standard_keeps_regexp_apart() {
        assert_eq!(run("a b /c.d/ e", SearchType::Standard), r#"(and "a b" "c.d" "e")"#);
    }

    #[test]
    fn test_negated_pattern_breaks_run() {
        assert_eq!(run("a -b c", SearchType::Standard), r#"(and "a" "NOT b" "c")"#);
    }

    #[test]
    fn test_fuzzy_regexp() {
        assert_eq!(run("foo bar", SearchType::Regex), r#""(?:foo).*?(?:bar)""#);
        assert_eq!(run(r#"a "b.c""#, SearchType::Regex), r#""(?:a).*?(?:b\\.c)""#);
    }

    #[test]
    fn test_regexp_empty_groups_escaped() {
        assert_eq!(run("foo()", SearchType::Regex), r#""foo\\(\\)""#);
        assert_eq!(run("foo( )", SearchType::Regex), r#""foo\\( \\)""#);
    }

    #[test]
    fn test_regexp_dangling_parens_escaped() {
        assert_eq!(run("foo)", SearchType::Regex), r#""foo\\)""#);
    }

    #[test]
    fn test_structural() {
        let nodes = init("foo(...) bar", SearchType::Structural)(Vec::new()).unwrap();
        let pattern = nodes[0].as_pattern().unwrap();
        assert_eq!(pattern.value, "foo(:[_]) bar");
        assert!(pattern.labels().contains(Labels::STRUCTURAL));
        assert!(!pattern.labels().contains(Labels::LITERAL));
    }

    #[test]
    fn test_detect_search_type() {
        assert_eq!(detect_search_type("foo patterntype:regexp", SearchType::Literal), SearchType::Regex);
        assert_eq!(detect_search_type("patternType:Literal x", SearchType::Regex), SearchType::Literal);
        assert_eq!(detect_search_type("foo", SearchType::Keyword), SearchType::Keyword);
        assert_eq!(detect_search_type("patterntype:bogus", SearchType::Lucky), SearchType::Lucky);
    }

    #[test]
    fn test_pattern_type_override_changes_grammar() {
        assert_eq!(run("foo bar patterntype:regexp", SearchType::Literal), r#"(and "patterntype:regexp" "(?:foo).*?(?:bar)")"#);
    }

    #[test]
    fn test_globbing() {
        let options = ParserOptions { search_type: SearchType::Standard, globbing: true };
        let nodes = init_with("repo:github.com/*@main file:*.rs x", options)(Vec::new()).unwrap();
        let mut values = std::collections::HashMap::new();
        crate::query::visitor::visit_parameters(&nodes, |p| {
            values.insert(p.field.clone(), p.value.clone());
        });

        let (repo, rev) = values["repo"].split_once('@').unwrap();
        assert_eq!(rev, "main");
        let repo = Regex::new(repo).unwrap();
        assert!(repo.is_match("github.com/sourcegraph"));
        assert!(!repo.is_match("gitlab.com/sourcegraph"));

        let file = Regex::new(&values["file"]).unwrap();
        assert!(file.is_match("src/main.rs"));
        assert!(!file.is_match("src/main.go"));
    }

    #[test]
    fn test_globbing_error() {
        let options = ParserOptions { search_type: SearchType::Standard, globbing: true };
        assert!(init_with("file:a[", options)(Vec::new()).is_err());
    }

    #[test]
    fn test_concat_rev_filters() {
        let plan = pipeline(vec![init("repo:sourcegraph rev:a", SearchType::Standard)]).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(to_string(&plan[0].to_parse_tree()), r#""repo:sourcegraph@a""#);
    }

    static TAGGED: LazyLock<Registry> = LazyLock::new(|| {
        Registry::new(PredicateRegistry::standard().register(FIELD_REPO, "tagged", PredicateKind::RepoHasTopic))
    });

    #[test]
    fn test_custom_predicate_registry() {
        let options = ParserOptions { search_type: SearchType::Standard, globbing: false };
        let plan = pipeline_with(vec![init_with_registry("repo:tagged(go) x", options, &TAGGED)], &TAGGED).unwrap();
        let repo = &plan[0].parameters[0];
        assert_eq!(repo.value, "tagged(go)");
        assert!(repo.annotation.labels.contains(Labels::IS_PREDICATE));
        assert_eq!(
            validate_plan(&plan, Registry::standard()).unwrap_err().to_string(),
            "invalid predicate value: unknown predicate repo:tagged"
        );

        let plan = pipeline(vec![init("repo:tagged(go) x", SearchType::Standard)]).unwrap();
        assert!(!plan[0].parameters[0].annotation.labels.contains(Labels::IS_PREDICATE));
    }

    #[test]
    fn test_sequence_stops_at_first_error() {
        let fail: Step = Box::new(|_| Err(QueryError::NoResults));
        let unreachable: Step = Box::new(|_| panic!("ran after failure"));
        assert!(matches!(sequence(vec![fail, unreachable])(Vec::new()), Err(QueryError::NoResults)));
    }
}
