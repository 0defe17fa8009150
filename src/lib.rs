//! # codeq - code search query language
//!
//! codeq parses code search queries such as
//! `repo:^github\.com/org/ lang:go (foo or bar) -file:_test`, normalizes them
//! according to a search type, and plans them into a disjunction of basic
//! queries that a search backend can run one by one.
//!
//! ## Architecture
//!
//! - [`query`] - scanning, parsing, transforms, validation and planning
//! - [`changeset`] - the reduced free-text grammar used for changeset lists
//! - [`output`] - terminal rendering for the `codeq` binary
//! - [`utils`] - user configuration
//!
//! ## Quick Start
//!
//! ```
//! use codeq::query::{SearchType, init, pipeline, string_human};
//!
//! let plan = pipeline(vec![init("(repo:a or repo:b) lang:go foo", SearchType::Standard)]).unwrap();
//! assert_eq!(plan.len(), 2);
//! for basic in plan.iter() {
//!     println!("{}", string_human(&basic.to_parse_tree()));
//! }
//! ```

pub mod changeset;
pub mod output;
pub mod query;
pub mod utils;
