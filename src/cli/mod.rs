//! cli
//!
//! Command-line interface layer: parses arguments and delegates to
//! command implementations.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use crate::ui::output::Verbosity;

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    let cwd = cli.cwd.as_deref();

    match cli.command {
        Command::Graph {
            limit,
            json,
            no_working_tree,
        } => commands::graph(cwd, limit, json, no_working_tree, verbosity).await,
        Command::Status { json } => commands::status(cwd, json, verbosity).await,
    }
}
