//! `select:` paths, such as `repo`, `file.directories` or `symbol.function`.

use std::fmt;

use super::error::{QueryError, Result};

/// A node of the tree of selectable result types.
struct SelectNode {
    name: &'static str,
    children: &'static [SelectNode],
}

const fn leaf(name: &'static str) -> SelectNode {
    SelectNode { name, children: &[] }
}

const SYMBOL_KINDS: &[SelectNode] = &[
    leaf("file"),
    leaf("module"),
    leaf("namespace"),
    leaf("package"),
    leaf("class"),
    leaf("method"),
    leaf("property"),
    leaf("field"),
    leaf("constructor"),
    leaf("enum"),
    leaf("interface"),
    leaf("function"),
    leaf("variable"),
    leaf("constant"),
    leaf("string"),
    leaf("number"),
    leaf("boolean"),
    leaf("array"),
    leaf("object"),
    leaf("key"),
    leaf("null"),
    leaf("enum-member"),
    leaf("struct"),
    leaf("event"),
    leaf("operator"),
    leaf("type-parameter"),
];

const SELECTORS: &[SelectNode] = &[
    leaf("repo"),
    SelectNode {
        name: "file",
        children: &[leaf("directories"), leaf("path"), leaf("owners")],
    },
    leaf("content"),
    SelectNode {
        name: "symbol",
        children: SYMBOL_KINDS,
    },
    SelectNode {
        name: "commit",
        children: &[SelectNode {
            name: "diff",
            children: &[leaf("added"), leaf("removed")],
        }],
    },
];

/// A validated `select:` value: the result type and its refinements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectPath {
    pub root: String,
    pub fields: Vec<String>,
}

impl SelectPath {
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split('.');
        let root = parts.next().unwrap_or_default();
        let Some(mut node) = SELECTORS.iter().find(|n| n.name == root) else {
            return Err(QueryError::validation(format!(
                "invalid select type {root:?}. Valid values are: repo, file, content, symbol, commit"
            )));
        };

        let mut fields = Vec::new();
        for part in parts {
            let Some(child) = node.children.iter().find(|n| n.name == part) else {
                return Err(QueryError::validation(format!(
                    "invalid field {part:?} on select path {value:?}"
                )));
            };
            fields.push(part.to_string());
            node = child;
        }
        Ok(Self {
            root: root.to_string(),
            fields,
        })
    }
}

impl fmt::Display for SelectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for field in &self.fields {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}
