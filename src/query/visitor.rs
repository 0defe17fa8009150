//! Read-only depth-first traversal of query trees.

use super::types::{Node, Operator, Parameter, Pattern};

/// Callbacks invoked for each node during [`walk`]. Operators are reported
/// before their operands.
pub trait Visitor {
    fn visit_pattern(&mut self, _pattern: &Pattern) {}

    fn visit_parameter(&mut self, _parameter: &Parameter) {}

    fn visit_operator(&mut self, _operator: &Operator) {}
}

pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Pattern(p) => visitor.visit_pattern(p),
            Node::Parameter(p) => visitor.visit_parameter(p),
            Node::Operator(op) => {
                visitor.visit_operator(op);
                walk(visitor, &op.operands);
            }
        }
    }
}

struct ParameterVisitor<F>(F);

impl<F: FnMut(&Parameter)> Visitor for ParameterVisitor<F> {
    fn visit_parameter(&mut self, parameter: &Parameter) {
        (self.0)(parameter)
    }
}

struct PatternVisitor<F>(F);

impl<F: FnMut(&Pattern)> Visitor for PatternVisitor<F> {
    fn visit_pattern(&mut self, pattern: &Pattern) {
        (self.0)(pattern)
    }
}

/// Calls `f` for every parameter under `nodes`.
pub fn visit_parameters(nodes: &[Node], f: impl FnMut(&Parameter)) {
    walk(&mut ParameterVisitor(f), nodes);
}

/// Calls `f` for every pattern under `nodes`.
pub fn visit_patterns(nodes: &[Node], f: impl FnMut(&Pattern)) {
    walk(&mut PatternVisitor(f), nodes);
}

/// Calls `f` for every parameter whose field is `field`.
pub fn visit_field(nodes: &[Node], field: &str, mut f: impl FnMut(&Parameter)) {
    visit_parameters(nodes, |p| {
        if p.field == field {
            f(p)
        }
    });
}
