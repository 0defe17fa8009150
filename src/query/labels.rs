//! Labels attached to nodes by the parser and the transform passes.
//!
//! Labels drive validation and printing: a `Regexp` pattern must compile, a
//! `Quoted` value is re-quoted by the printer, and the `Heuristic*` markers
//! record which disambiguation rule produced a node.

use bitflags::bitflags;

bitflags! {
    /// Bitset of node labels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Labels: u16 {
        const LITERAL = 1 << 0;
        const REGEXP = 1 << 1;
        const QUOTED = 1 << 2;
        const HEURISTIC_PARENS_AS_PATTERNS = 1 << 3;
        const HEURISTIC_DANGLING_PARENS = 1 << 4;
        const HEURISTIC_HOISTED = 1 << 5;
        const STRUCTURAL = 1 << 6;
        const IS_PREDICATE = 1 << 7;
        const IS_ALIAS = 1 << 8;
        const STANDARD = 1 << 9;
    }
}

impl Labels {
    /// Human-readable names of the set labels, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        const NAMES: [(Labels, &str); 10] = [
            (Labels::LITERAL, "Literal"),
            (Labels::REGEXP, "Regexp"),
            (Labels::QUOTED, "Quoted"),
            (Labels::HEURISTIC_PARENS_AS_PATTERNS, "HeuristicParensAsPatterns"),
            (Labels::HEURISTIC_DANGLING_PARENS, "HeuristicDanglingParens"),
            (Labels::HEURISTIC_HOISTED, "HeuristicHoisted"),
            (Labels::STRUCTURAL, "Structural"),
            (Labels::IS_PREDICATE, "IsPredicate"),
            (Labels::IS_ALIAS, "IsAlias"),
            (Labels::STANDARD, "Standard"),
        ];
        NAMES
            .iter()
            .filter(|(label, _)| self.contains(*label))
            .map(|(_, name)| *name)
            .collect()
    }
}
