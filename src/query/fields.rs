//! Recognized fields, their aliases, and the registry bundling them with the
//! predicate table.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use super::predicate::PredicateRegistry;

pub const FIELD_REPO: &str = "repo";
pub const FIELD_REPO_HAS_FILE: &str = "repohasfile";
pub const FIELD_REPO_HAS_COMMIT_AFTER: &str = "repohascommitafter";
pub const FIELD_REPO_HAS_DESCRIPTION: &str = "repohasdescription";
pub const FIELD_FILE: &str = "file";
pub const FIELD_LANG: &str = "lang";
pub const FIELD_CASE: &str = "case";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_PATTERN_TYPE: &str = "patterntype";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_VISIBILITY: &str = "visibility";
pub const FIELD_REV: &str = "rev";
pub const FIELD_CONTEXT: &str = "context";
pub const FIELD_BEFORE: &str = "before";
pub const FIELD_AFTER: &str = "after";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_COMMITTER: &str = "committer";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_INDEX: &str = "index";
pub const FIELD_COUNT: &str = "count";
pub const FIELD_TIMEOUT: &str = "timeout";
pub const FIELD_FORK: &str = "fork";
pub const FIELD_ARCHIVED: &str = "archived";
pub const FIELD_SELECT: &str = "select";

/// Canonical field names, in documentation order.
pub const ALL_FIELDS: [&str; 24] = [
    FIELD_REPO,
    FIELD_REPO_HAS_FILE,
    FIELD_REPO_HAS_COMMIT_AFTER,
    FIELD_REPO_HAS_DESCRIPTION,
    FIELD_FILE,
    FIELD_LANG,
    FIELD_CASE,
    FIELD_TYPE,
    FIELD_PATTERN_TYPE,
    FIELD_CONTENT,
    FIELD_VISIBILITY,
    FIELD_REV,
    FIELD_CONTEXT,
    FIELD_BEFORE,
    FIELD_AFTER,
    FIELD_AUTHOR,
    FIELD_COMMITTER,
    FIELD_MESSAGE,
    FIELD_INDEX,
    FIELD_COUNT,
    FIELD_TIMEOUT,
    FIELD_FORK,
    FIELD_ARCHIVED,
    FIELD_SELECT,
];

/// Alternative spellings and their canonical field.
pub const ALIASES: [(&str, &str); 10] = [
    ("r", FIELD_REPO),
    ("f", FIELD_FILE),
    ("path", FIELD_FILE),
    ("l", FIELD_LANG),
    ("language", FIELD_LANG),
    ("since", FIELD_AFTER),
    ("until", FIELD_BEFORE),
    ("m", FIELD_MESSAGE),
    ("msg", FIELD_MESSAGE),
    ("revision", FIELD_REV),
];

/// Fields that only make sense for commit and diff searches.
pub const COMMIT_FIELDS: [&str; 5] = [
    FIELD_AUTHOR,
    FIELD_COMMITTER,
    FIELD_MESSAGE,
    FIELD_BEFORE,
    FIELD_AFTER,
];

/// Immutable lookup tables consulted by the scanner, parser and validator.
///
/// Build one with [`Registry::new`] to customize predicates, or share the
/// process-wide default from [`Registry::standard`].
#[derive(Debug)]
pub struct Registry {
    canonical: FxHashMap<&'static str, &'static str>,
    predicates: PredicateRegistry,
}

static STANDARD: LazyLock<Registry> = LazyLock::new(|| Registry::new(PredicateRegistry::standard()));

impl Registry {
    pub fn new(predicates: PredicateRegistry) -> Self {
        let mut canonical = FxHashMap::default();
        for field in ALL_FIELDS {
            canonical.insert(field, field);
        }
        for (alias, field) in ALIASES {
            canonical.insert(alias, field);
        }
        Self { canonical, predicates }
    }

    pub fn standard() -> &'static Registry {
        &STANDARD
    }

    /// Reports whether `name` (any case, alias or canonical) is a field.
    pub fn is_field(&self, name: &str) -> bool {
        self.canonical(name).is_some()
    }

    /// Resolves `name` to its canonical field name.
    pub fn canonical(&self, name: &str) -> Option<&'static str> {
        self.canonical.get(name.to_lowercase().as_str()).copied()
    }

    pub fn predicates(&self) -> &PredicateRegistry {
        &self.predicates
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(PredicateRegistry::standard())
    }
}
