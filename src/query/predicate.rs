//! Predicates: function-call syntax embedded in a field value, such as
//! `repo:contains.file(path:README content:license)`.
//!
//! The scanner recognizes a call by looking up its name in the
//! [`PredicateRegistry`] for the field. [`Predicate::unmarshal`] then parses
//! the argument text according to the predicate's own mini-syntax. Evaluating
//! a predicate against live data is left to callers (see
//! [`super::substitute`]).

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;

use super::error::{QueryError, Result};
use super::fields::{FIELD_FILE, FIELD_REPO, Registry};
use super::parser::parse;
use super::scanner::scan_delimited;
use super::types::{Node, OperatorKind, SearchType};
use super::values::parse_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    RepoContainsFile,
    RepoContainsPath,
    RepoContainsContent,
    RepoContainsCommitAfter,
    RepoHasDescription,
    RepoHasMeta,
    RepoHasKvp,
    RepoHasTag,
    RepoHasKey,
    RepoHasTopic,
    FileContainsContent,
    FileHasOwner,
    FileHasContributor,
}

impl PredicateKind {
    /// The field this predicate appears in.
    pub fn field(self) -> &'static str {
        match self {
            PredicateKind::FileContainsContent
            | PredicateKind::FileHasOwner
            | PredicateKind::FileHasContributor => FIELD_FILE,
            _ => FIELD_REPO,
        }
    }

    /// Canonical name of the predicate.
    pub fn name(self) -> &'static str {
        match self {
            PredicateKind::RepoContainsFile => "contains.file",
            PredicateKind::RepoContainsPath => "contains.path",
            PredicateKind::RepoContainsContent => "contains.content",
            PredicateKind::RepoContainsCommitAfter => "contains.commit.after",
            PredicateKind::RepoHasDescription => "has.description",
            PredicateKind::RepoHasMeta => "has.meta",
            PredicateKind::RepoHasKvp => "has",
            PredicateKind::RepoHasTag => "has.tag",
            PredicateKind::RepoHasKey => "has.key",
            PredicateKind::RepoHasTopic => "has.topic",
            PredicateKind::FileContainsContent => "contains.content",
            PredicateKind::FileHasOwner => "has.owner",
            PredicateKind::FileHasContributor => "has.contributor",
        }
    }

    /// The name without its `contains.` or `has.` verb, such as `file` or
    /// `commit.after`.
    pub fn plain_name(self) -> &'static str {
        let name = self.name();
        name.strip_prefix("contains.")
            .or_else(|| name.strip_prefix("has."))
            .unwrap_or(name)
    }

    pub fn supports_negation(self) -> bool {
        !matches!(
            self,
            PredicateKind::RepoHasDescription | PredicateKind::FileContainsContent
        )
    }
}

/// Predicate names available per field.
#[derive(Debug, Clone, Default)]
pub struct PredicateRegistry {
    by_field: FxHashMap<&'static str, FxHashMap<&'static str, PredicateKind>>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The predicates understood by the search backend.
    pub fn standard() -> Self {
        use PredicateKind::*;
        Self::new()
            .register(FIELD_REPO, "contains.file", RepoContainsFile)
            .register(FIELD_REPO, "has.file", RepoContainsFile)
            .register(FIELD_REPO, "contains.path", RepoContainsPath)
            .register(FIELD_REPO, "has.path", RepoContainsPath)
            .register(FIELD_REPO, "contains.content", RepoContainsContent)
            .register(FIELD_REPO, "has.content", RepoContainsContent)
            .register(FIELD_REPO, "contains.commit.after", RepoContainsCommitAfter)
            .register(FIELD_REPO, "has.commit.after", RepoContainsCommitAfter)
            .register(FIELD_REPO, "has.description", RepoHasDescription)
            .register(FIELD_REPO, "has.meta", RepoHasMeta)
            .register(FIELD_REPO, "has", RepoHasKvp)
            .register(FIELD_REPO, "has.tag", RepoHasTag)
            .register(FIELD_REPO, "has.key", RepoHasKey)
            .register(FIELD_REPO, "has.topic", RepoHasTopic)
            .register(FIELD_FILE, "contains.content", FileContainsContent)
            .register(FIELD_FILE, "has.content", FileContainsContent)
            .register(FIELD_FILE, "has.owner", FileHasOwner)
            .register(FIELD_FILE, "has.contributor", FileHasContributor)
    }

    pub fn register(mut self, field: &'static str, name: &'static str, kind: PredicateKind) -> Self {
        self.by_field.entry(field).or_default().insert(name, kind);
        self
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.by_field.contains_key(field)
    }

    pub fn contains(&self, field: &str, name: &str) -> bool {
        self.get(field, name).is_some()
    }

    pub fn get(&self, field: &str, name: &str) -> Option<PredicateKind> {
        self.by_field
            .get(field)?
            .get(name.to_lowercase().as_str())
            .copied()
    }
}

static PREDICATE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[a-zA-Z.]+)\((?s:(?P<params>.*))\)$").unwrap()
});

/// Splits a predicate call into its name and argument text.
///
/// # Panics
///
/// Assumes prior validation: the value must have been recognized as a
/// predicate call by the scanner. Anything else is an internal error.
pub fn parse_as_predicate(value: &str) -> (String, String) {
    let Some(caps) = PREDICATE_CALL.captures(value) else {
        panic!("parse_as_predicate called on a value that is not a predicate call: {value:?}");
    };
    (caps["name"].to_string(), caps["params"].to_string())
}

/// A parsed predicate with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    RepoContainsFile {
        path: Option<String>,
        content: Option<String>,
        negated: bool,
    },
    RepoContainsPath { path: String, negated: bool },
    RepoContainsContent { pattern: String, negated: bool },
    RepoContainsCommitAfter { time_ref: String, negated: bool },
    RepoHasDescription { pattern: String },
    RepoHasMeta {
        key: String,
        value: Option<String>,
        negated: bool,
    },
    RepoHasKvp {
        key: String,
        value: String,
        negated: bool,
    },
    RepoHasTag { key: String, negated: bool },
    RepoHasKey { key: String, negated: bool },
    RepoHasTopic { topic: String, negated: bool },
    FileContainsContent { pattern: String },
    FileHasOwner { owner: String, negated: bool },
    FileHasContributor { contributor: String, negated: bool },
}

impl Predicate {
    /// Parses the predicate call found in the value of `field`.
    pub fn parse(field: &str, value: &str, negated: bool, registry: &Registry) -> Result<Self> {
        let (name, params) = parse_as_predicate(value);
        let canonical = registry.canonical(field).unwrap_or(field);
        let kind = registry
            .predicates()
            .get(canonical, &name)
            .ok_or_else(|| QueryError::predicate(format!("unknown predicate {canonical}:{name}")))?;
        Self::unmarshal(kind, &params, negated)
    }

    /// Parses `params` according to the syntax of `kind`.
    pub fn unmarshal(kind: PredicateKind, params: &str, negated: bool) -> Result<Self> {
        if negated && !kind.supports_negation() {
            return Err(QueryError::NegatedPredicate {
                name: kind.name().to_string(),
            });
        }

        let predicate = match kind {
            PredicateKind::RepoContainsFile => {
                let (path, content) = unmarshal_contains_file(params)?;
                Predicate::RepoContainsFile { path, content, negated }
            }
            PredicateKind::RepoContainsPath => Predicate::RepoContainsPath {
                path: regex_arg(kind, params)?,
                negated,
            },
            PredicateKind::RepoContainsContent => Predicate::RepoContainsContent {
                pattern: regex_arg(kind, params)?,
                negated,
            },
            PredicateKind::RepoContainsCommitAfter => {
                let time_ref = non_empty_arg(kind, params)?;
                parse_date(&time_ref).map_err(|_| {
                    QueryError::predicate(format!(
                        "{}: could not parse time reference {time_ref:?}",
                        kind.name()
                    ))
                })?;
                Predicate::RepoContainsCommitAfter { time_ref, negated }
            }
            PredicateKind::RepoHasDescription => Predicate::RepoHasDescription {
                pattern: regex_arg(kind, params)?,
            },
            PredicateKind::RepoHasMeta => {
                let (key, value) = unmarshal_meta(params)?;
                Predicate::RepoHasMeta { key, value, negated }
            }
            PredicateKind::RepoHasKvp => {
                let Some((key, value)) = params.split_once(':') else {
                    return Err(QueryError::predicate(
                        "has: expected parameters of the form key:value",
                    ));
                };
                if key.is_empty() {
                    return Err(QueryError::predicate("has: key cannot be empty"));
                }
                Predicate::RepoHasKvp {
                    key: key.to_string(),
                    value: value.to_string(),
                    negated,
                }
            }
            PredicateKind::RepoHasTag => Predicate::RepoHasTag {
                key: non_empty_arg(kind, params)?,
                negated,
            },
            PredicateKind::RepoHasKey => Predicate::RepoHasKey {
                key: non_empty_arg(kind, params)?,
                negated,
            },
            PredicateKind::RepoHasTopic => Predicate::RepoHasTopic {
                topic: non_empty_arg(kind, params)?,
                negated,
            },
            PredicateKind::FileContainsContent => Predicate::FileContainsContent {
                pattern: regex_arg(kind, params)?,
            },
            PredicateKind::FileHasOwner => Predicate::FileHasOwner {
                owner: non_empty_arg(kind, params)?,
                negated,
            },
            PredicateKind::FileHasContributor => Predicate::FileHasContributor {
                contributor: regex_arg(kind, params)?,
                negated,
            },
        };
        Ok(predicate)
    }

    pub fn kind(&self) -> PredicateKind {
        match self {
            Predicate::RepoContainsFile { .. } => PredicateKind::RepoContainsFile,
            Predicate::RepoContainsPath { .. } => PredicateKind::RepoContainsPath,
            Predicate::RepoContainsContent { .. } => PredicateKind::RepoContainsContent,
            Predicate::RepoContainsCommitAfter { .. } => PredicateKind::RepoContainsCommitAfter,
            Predicate::RepoHasDescription { .. } => PredicateKind::RepoHasDescription,
            Predicate::RepoHasMeta { .. } => PredicateKind::RepoHasMeta,
            Predicate::RepoHasKvp { .. } => PredicateKind::RepoHasKvp,
            Predicate::RepoHasTag { .. } => PredicateKind::RepoHasTag,
            Predicate::RepoHasKey { .. } => PredicateKind::RepoHasKey,
            Predicate::RepoHasTopic { .. } => PredicateKind::RepoHasTopic,
            Predicate::FileContainsContent { .. } => PredicateKind::FileContainsContent,
            Predicate::FileHasOwner { .. } => PredicateKind::FileHasOwner,
            Predicate::FileHasContributor { .. } => PredicateKind::FileHasContributor,
        }
    }

    pub fn field(&self) -> &'static str {
        self.kind().field()
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn plain_name(&self) -> &'static str {
        self.kind().plain_name()
    }

    pub fn negated(&self) -> bool {
        match self {
            Predicate::RepoHasDescription { .. } | Predicate::FileContainsContent { .. } => false,
            Predicate::RepoContainsFile { negated, .. }
            | Predicate::RepoContainsPath { negated, .. }
            | Predicate::RepoContainsContent { negated, .. }
            | Predicate::RepoContainsCommitAfter { negated, .. }
            | Predicate::RepoHasMeta { negated, .. }
            | Predicate::RepoHasKvp { negated, .. }
            | Predicate::RepoHasTag { negated, .. }
            | Predicate::RepoHasKey { negated, .. }
            | Predicate::RepoHasTopic { negated, .. }
            | Predicate::FileHasOwner { negated, .. }
            | Predicate::FileHasContributor { negated, .. } => *negated,
        }
    }
}

fn non_empty_arg(kind: PredicateKind, params: &str) -> Result<String> {
    let arg = params.trim();
    if arg.is_empty() {
        return Err(QueryError::predicate(format!(
            "{} requires a non-empty argument",
            kind.name()
        )));
    }
    Ok(arg.to_string())
}

fn regex_arg(kind: PredicateKind, params: &str) -> Result<String> {
    let arg = non_empty_arg(kind, params)?;
    Regex::new(&arg).map_err(|e| QueryError::predicate(format!("{}: {e}", kind.name())))?;
    Ok(arg)
}

/// Parses `path:... content:...` arguments with the query parser itself.
fn unmarshal_contains_file(params: &str) -> Result<(Option<String>, Option<String>)> {
    fn collect(node: &Node, path: &mut Option<String>, content: &mut Option<String>) -> Result<()> {
        match node {
            Node::Parameter(p) => {
                let slot = match p.field.to_lowercase().as_str() {
                    "path" | "file" | "f" => path,
                    "content" => content,
                    other => {
                        return Err(QueryError::predicate(format!(
                            "contains.file: unsupported option {other:?}"
                        )));
                    }
                };
                if p.negated {
                    return Err(QueryError::predicate(format!(
                        "contains.file: {} cannot be negated",
                        p.field
                    )));
                }
                if slot.is_some() {
                    return Err(QueryError::predicate(format!(
                        "contains.file: {} may only be given once",
                        p.field
                    )));
                }
                Regex::new(&p.value)
                    .map_err(|e| QueryError::predicate(format!("contains.file: {e}")))?;
                *slot = Some(p.value.clone());
                Ok(())
            }
            Node::Pattern(p) => Err(QueryError::predicate(format!(
                "contains.file: unexpected pattern {:?}, use path: or content:",
                p.value
            ))),
            Node::Operator(op) if op.kind == OperatorKind::Or => Err(QueryError::predicate(
                "contains.file: predicates do not support or-expressions",
            )),
            Node::Operator(op) => op
                .operands
                .iter()
                .try_for_each(|operand| collect(operand, path, content)),
        }
    }

    let nodes = parse(params, SearchType::Regex)
        .map_err(|e| QueryError::predicate(format!("contains.file: {e}")))?;
    let (mut path, mut content) = (None, None);
    for node in &nodes {
        collect(node, &mut path, &mut content)?;
    }
    if path.is_none() && content.is_none() {
        return Err(QueryError::predicate(
            "contains.file: one of path or content must be set",
        ));
    }
    Ok((path, content))
}

/// Scans one key or value of the `has.meta` mini-language: a quoted string,
/// or raw text up to the next `:`.
fn scan_meta_literal(data: &str) -> Result<(String, usize)> {
    if data.starts_with('"') || data.starts_with('\'') {
        let delimiter = if data.starts_with('"') { '"' } else { '\'' };
        return scan_delimited(data, true, delimiter)
            .map_err(|e| QueryError::predicate(format!("has.meta: {e}")));
    }
    let end = data.find(':').unwrap_or(data.len());
    Ok((data[..end].to_string(), end))
}

/// Parses `key`, `key:value`, or quoted forms like `"a key":'a value'`.
fn unmarshal_meta(params: &str) -> Result<(String, Option<String>)> {
    let (key, advance) = scan_meta_literal(params)?;
    if key.is_empty() {
        return Err(QueryError::predicate("has.meta: key cannot be empty"));
    }

    let rest = &params[advance..];
    if rest.is_empty() {
        return Ok((key, None));
    }
    let Some(rest) = rest.strip_prefix(':') else {
        return Err(QueryError::predicate(
            "has.meta: expected parameters of the form key:value",
        ));
    };

    let (value, advance) = scan_meta_literal(rest)?;
    if advance != rest.len() {
        return Err(QueryError::predicate(format!(
            "has.meta: unexpected trailing text {:?}",
            &rest[advance..]
        )));
    }
    Ok((key, Some(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_as_predicate() {
        assert_eq!(
            parse_as_predicate("contains.file(path:foo content:bar)"),
            ("contains.file".to_string(), "path:foo content:bar".to_string())
        );
        assert_eq!(
            parse_as_predicate("has.meta()"),
            ("has.meta".to_string(), String::new())
        );
    }

    #[test]
    #[should_panic]
    fn test_parse_as_predicate_panics_on_invalid_input() {
        parse_as_predicate("not a predicate");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = PredicateRegistry::standard();
        assert_eq!(registry.get("repo", "has.file"), Some(PredicateKind::RepoContainsFile));
        assert_eq!(
            registry.get("file", "contains.content"),
            Some(PredicateKind::FileContainsContent)
        );
        assert!(registry.get("lang", "contains.file").is_none());
        assert!(registry.has_field("file"));
        assert!(!registry.has_field("lang"));
    }

    #[test]
    fn test_contains_file() {
        let p = Predicate::unmarshal(PredicateKind::RepoContainsFile, "path:README content:license", false)
            .unwrap();
        assert_eq!(
            p,
            Predicate::RepoContainsFile {
                path: Some("README".to_string()),
                content: Some("license".to_string()),
                negated: false,
            }
        );
    }

    #[test]
    fn test_contains_file_errors() {
        let kind = PredicateKind::RepoContainsFile;
        assert!(Predicate::unmarshal(kind, "", false).is_err());
        assert!(Predicate::unmarshal(kind, "bare", false).is_err());
        assert!(Predicate::unmarshal(kind, "lang:go", false).is_err());
        assert!(Predicate::unmarshal(kind, "path:a path:b", false).is_err());
        assert!(Predicate::unmarshal(kind, "path:(", false).is_err());
        let err = Predicate::unmarshal(kind, "path:a or content:b", false).unwrap_err();
        assert!(err.to_string().starts_with("invalid predicate value: "));
    }

    #[test]
    fn test_has_meta() {
        let kind = PredicateKind::RepoHasMeta;
        assert_eq!(
            Predicate::unmarshal(kind, "team:search", false).unwrap(),
            Predicate::RepoHasMeta {
                key: "team".to_string(),
                value: Some("search".to_string()),
                negated: false,
            }
        );
        assert_eq!(
            Predicate::unmarshal(kind, "archived", true).unwrap(),
            Predicate::RepoHasMeta {
                key: "archived".to_string(),
                value: None,
                negated: true,
            }
        );
        assert_eq!(
            Predicate::unmarshal(kind, r#""my key":'a:b'"#, false).unwrap(),
            Predicate::RepoHasMeta {
                key: "my key".to_string(),
                value: Some("a:b".to_string()),
                negated: false,
            }
        );
        assert!(Predicate::unmarshal(kind, ":value", false).is_err());
        assert!(Predicate::unmarshal(kind, r#""key"x"#, false).is_err());
        assert!(Predicate::unmarshal(kind, r#""unterminated"#, false).is_err());
    }

    #[test]
    fn test_negation_support() {
        let err = Predicate::unmarshal(PredicateKind::RepoHasDescription, "foo", true).unwrap_err();
        assert!(matches!(err, QueryError::NegatedPredicate { ref name } if name == "has.description"));
        assert!(Predicate::unmarshal(PredicateKind::RepoHasTopic, "rust", true).unwrap().negated());
    }

    #[test]
    fn test_commit_after() {
        assert!(Predicate::unmarshal(PredicateKind::RepoContainsCommitAfter, "1 month ago", false).is_ok());
        assert!(Predicate::unmarshal(PredicateKind::RepoContainsCommitAfter, "whenever", false).is_err());
    }

    #[test]
    fn test_parse_resolves_field_alias() {
        let registry = Registry::standard();
        let p = Predicate::parse("r", "has.topic(go)", false, registry).unwrap();
        assert_eq!(p.name(), "has.topic");
        assert_eq!(p.field(), "repo");
        assert_eq!(p.plain_name(), "topic");
        assert_eq!(PredicateKind::RepoContainsCommitAfter.plain_name(), "commit.after");
        assert_eq!(PredicateKind::RepoHasKvp.plain_name(), "has");
    }
}
