//! Rendering query trees as query strings and as JSON.

use serde_json::{Value, json};

use super::fields::Registry;
use super::labels::Labels;
use super::scanner::{scan_balanced_pattern, scan_field};
use super::types::{Node, OperatorKind, Parameter, Pattern, Range, contains_pattern, quote};

/// Renders `nodes` as a query string that parses back to an equivalent
/// query. `AND` and `OR` are written only where juxtaposition would read
/// differently.
pub fn string_human(nodes: &[Node]) -> String {
    string_human_with(nodes, Registry::standard())
}

/// Like [`string_human`], recognizing the fields of `registry`.
pub fn string_human_with(nodes: &[Node], registry: &Registry) -> String {
    nodes
        .iter()
        .map(|node| render(node, false, registry))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render(node: &Node, nested: bool, registry: &Registry) -> String {
    match node {
        Node::Pattern(p) => render_pattern(p, registry),
        Node::Parameter(p) => render_parameter(p),
        Node::Operator(op) => {
            let separator = match op.kind {
                OperatorKind::Or => " OR ",
                OperatorKind::And if op.operands.iter().filter(|n| contains_pattern(n)).count() > 1 => " AND ",
                OperatorKind::And | OperatorKind::Concat => " ",
            };
            let inner = op
                .operands
                .iter()
                .map(|operand| render(operand, true, registry))
                .collect::<Vec<_>>()
                .join(separator);
            if nested { format!("({inner})") } else { inner }
        }
    }
}

/// Reports whether `value` would be read back as a single plain pattern.
fn is_plain_pattern(value: &str, registry: &Registry) -> bool {
    if value.starts_with(['"', '\'', '/', '-']) || scan_field(value, registry).is_some() {
        return false;
    }
    if ["and", "or", "not"].iter().any(|k| value.eq_ignore_ascii_case(k)) {
        return false;
    }
    matches!(scan_balanced_pattern(value, registry), Some((_, n)) if n == value.len())
}

/// Escapes backslashes and `/` so the value scans back unchanged between slashes.
fn escape_slashes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '/' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn render_pattern(p: &Pattern, registry: &Registry) -> String {
    let labels = p.labels();
    if labels.contains(Labels::IS_ALIAS) {
        let sign = if p.negated { "-" } else { "" };
        return format!("{sign}content:{}", quote(&p.value));
    }

    let value = if labels.contains(Labels::QUOTED) {
        quote(&p.value)
    } else if labels.contains(Labels::REGEXP) {
        format!("/{}/", escape_slashes(&p.value))
    } else if is_plain_pattern(&p.value, registry) {
        p.value.clone()
    } else {
        let sign = if p.negated { "-" } else { "" };
        return format!("{sign}content:{}", quote(&p.value));
    };

    if p.negated { format!("NOT {value}") } else { value }
}

fn render_parameter(p: &Parameter) -> String {
    let needs_quotes = !p.annotation.labels.contains(Labels::IS_PREDICATE)
        && (p.annotation.labels.contains(Labels::QUOTED)
            || p.value.is_empty()
            || p.value.contains(|c: char| c.is_whitespace() || c == '(' || c == ')')
            || p.value.starts_with(['"', '\'']));
    let value = if needs_quotes { quote(&p.value) } else { p.value.clone() };
    let sign = if p.negated { "-" } else { "" };
    format!("{sign}{}:{value}", p.field)
}

fn range_json(range: &Range) -> Value {
    json!({
        "start": { "line": range.start.line, "column": range.start.column },
        "end": { "line": range.end.line, "column": range.end.column },
    })
}

/// Structural JSON form of `nodes`, for diagnostics and tests.
pub fn to_json_value(nodes: &[Node]) -> Value {
    Value::Array(nodes.iter().map(node_json).collect())
}

fn node_json(node: &Node) -> Value {
    match node {
        Node::Pattern(p) => json!({
            "value": p.value,
            "negated": p.negated,
            "labels": p.labels().names(),
            "range": range_json(&p.annotation.range),
        }),
        Node::Parameter(p) => json!({
            "field": p.field,
            "value": p.value,
            "negated": p.negated,
            "labels": p.annotation.labels.names(),
            "range": range_json(&p.annotation.range),
        }),
        Node::Operator(op) => {
            let operands: Vec<Value> = op.operands.iter().map(node_json).collect();
            json!({ op.kind.as_str(): operands })
        }
    }
}

pub fn to_json(nodes: &[Node]) -> String {
    to_json_value(nodes).to_string()
}

pub fn pretty_json(nodes: &[Node]) -> String {
    format!("{:#}", to_json_value(nodes))
}
