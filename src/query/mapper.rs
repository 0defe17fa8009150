//! Rewriting traversal of query trees.
//!
//! A [`Mapper`] consumes a tree and builds a new one. Leaf callbacks return a
//! replacement node, or `None` to delete the leaf. Operators are rebuilt
//! through [`new_operator`] after their operands are mapped, so deleting or
//! replacing children never leaves a degenerate operator behind.

use super::types::{Node, OperatorKind, Parameter, Pattern, new_operator};

pub trait Mapper {
    fn map_pattern(&mut self, pattern: Pattern) -> Option<Node> {
        Some(pattern.into())
    }

    fn map_parameter(&mut self, parameter: Parameter) -> Option<Node> {
        Some(parameter.into())
    }

    /// Called with operands that are already mapped.
    fn map_operator(&mut self, kind: OperatorKind, operands: Vec<Node>) -> Vec<Node> {
        new_operator(operands, kind)
    }
}

pub fn map_nodes<M: Mapper + ?Sized>(mapper: &mut M, nodes: Vec<Node>) -> Vec<Node> {
    let mut result = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Pattern(p) => result.extend(mapper.map_pattern(p)),
            Node::Parameter(p) => result.extend(mapper.map_parameter(p)),
            Node::Operator(op) => {
                let operands = map_nodes(mapper, op.operands);
                result.extend(mapper.map_operator(op.kind, operands));
            }
        }
    }
    result
}

pub struct ParameterMapper<F>(pub F);

impl<F: FnMut(Parameter) -> Option<Node>> Mapper for ParameterMapper<F> {
    fn map_parameter(&mut self, parameter: Parameter) -> Option<Node> {
        (self.0)(parameter)
    }
}

pub struct PatternMapper<F>(pub F);

impl<F: FnMut(Pattern) -> Option<Node>> Mapper for PatternMapper<F> {
    fn map_pattern(&mut self, pattern: Pattern) -> Option<Node> {
        (self.0)(pattern)
    }
}

/// Maps only the parameters of one field; everything else is kept.
pub struct FieldMapper<'a, F> {
    pub field: &'a str,
    pub f: F,
}

impl<F: FnMut(Parameter) -> Option<Node>> Mapper for FieldMapper<'_, F> {
    fn map_parameter(&mut self, parameter: Parameter) -> Option<Node> {
        if parameter.field == self.field {
            (self.f)(parameter)
        } else {
            Some(parameter.into())
        }
    }
}

pub fn map_parameters(nodes: Vec<Node>, f: impl FnMut(Parameter) -> Option<Node>) -> Vec<Node> {
    map_nodes(&mut ParameterMapper(f), nodes)
}

pub fn map_patterns(nodes: Vec<Node>, f: impl FnMut(Pattern) -> Option<Node>) -> Vec<Node> {
    map_nodes(&mut PatternMapper(f), nodes)
}

pub fn map_field(nodes: Vec<Node>, field: &str, f: impl FnMut(Parameter) -> Option<Node>) -> Vec<Node> {
    map_nodes(&mut FieldMapper { field, f }, nodes)
}
