// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{CliArgs, Command, ContendArgs, RunArgs, TransportType};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// If parsing fails (unknown command, invalid value, or --help), clap prints
/// the error or help text and exits the process.
///
/// # Returns
///
/// Returns a `CliArgs` struct with the parsed command-line arguments.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
