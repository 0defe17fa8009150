//! The query language: parsing, normalization, validation and planning.
//!
//! ```
//! use codeq::query::{SearchType, init, pipeline};
//!
//! let plan = pipeline(vec![init("repo:foo (bar or baz)", SearchType::Standard)]).unwrap();
//! assert_eq!(plan.len(), 1);
//! ```

pub mod error;
pub mod fields;
pub mod hoist;
pub mod labels;
pub mod mapper;
pub mod parser;
pub mod planner;
pub mod predicate;
pub mod printer;
pub mod scanner;
pub mod select;
pub mod substitute;
pub mod transformer;
pub mod types;
pub mod validate;
pub mod values;
pub mod visitor;

// Re-exports for public API
pub use error::{QueryError, Result, UnsupportedError};
pub use fields::Registry;
pub use labels::Labels;
pub use parser::{ParserOptions, parse, parse_with};
pub use planner::{Basic, Plan, build_plan};
pub use predicate::{Predicate, PredicateKind, PredicateRegistry};
pub use printer::{pretty_json, string_human, string_human_with, to_json};
pub use select::SelectPath;
pub use substitute::{PredicateMatch, substitute_predicates, substitute_search_contexts};
pub use transformer::{init, init_with, init_with_registry, pipeline, pipeline_with};
pub use types::{Node, Operator, OperatorKind, Parameter, Pattern, SearchType};
pub use validate::{validate, validate_plan};
pub use values::YesNoOnly;
