//! CLI output formatting module
//!
//! Provides various output formatters for terminal display.

pub mod table;

pub use table::TableFormatter;
