//! Shared helpers for the command-line tool.
//!
//! - [`app_data`] - user configuration in the platform app data directory

pub mod app_data;

pub use app_data::*;
