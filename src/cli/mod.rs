//! Command-line interface for promptlint.
//!
//! Provides the `check`, `list` and `rules` commands.

mod commands;

pub use commands::{
    execute, parse_cli, run, run_with_cli, CheckArgs, Cli, Commands, ListArgs, ListEntry,
    OutputFormat, RulesArgs, EXIT_GATE_FAILED, EXIT_PASSED,
};
