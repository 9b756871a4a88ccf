//! Command-line interface for civant-enrich.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands};
