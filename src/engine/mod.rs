//! Engine module: CLI surface, progress reporting and path utilities

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{RunConfig, handle_run, resolve_config};
pub use tools::{glob_under, has_wildcard, is_safe_selector, is_under_root, parse_delimiter};
