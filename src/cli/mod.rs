//! CLI module
//!
//! Command-line interface over a single portal.
//!
//! # Commands
//!
//! - `list` - Traverse a list method, one JSON record per line
//! - `call` - Call a single method and print its result

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, Variant};
pub use runner::Runner;
