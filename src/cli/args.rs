//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lanework - commit graph cache with branch-lane layout
#[derive(Parser, Debug)]
#[command(name = "lanework")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if lanework was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the commit graph with lane assignments
    #[command(
        name = "graph",
        long_about = "Render the commit graph with lane assignments.\n\n\
            Fetches the raw log, builds the lane-annotated graph, and prints one \
            line per commit: lane glyphs, abbreviated id, and subject. When the \
            working tree is dirty an extra row with the '@' glyph represents the \
            uncommitted changes.",
        after_help = "\
EXAMPLES:
    # Render the full graph
    lw graph

    # Only the most recent 200 commits
    lw graph -n 200

    # Machine-readable output for tooling
    lw graph --json

READING THE OUTPUT:
    *    commit on its lane
    |    another line passing through
    \\    lane opened for a merge parent
    /    lane collapsing into a shared parent
    @    uncommitted working-tree changes"
    )]
    Graph {
        /// Limit the number of commits fetched
        #[arg(short = 'n', long, value_name = "COUNT")]
        limit: Option<u32>,

        /// Output the graph as JSON
        #[arg(long)]
        json: bool,

        /// Never inject the working-tree row, even when the tree is dirty
        #[arg(long)]
        no_working_tree: bool,
    },

    /// Show repository state and graph statistics
    #[command(
        name = "status",
        long_about = "Show repository state and graph statistics.\n\n\
            Prints the current branch, tip, dirty flag, and summary statistics \
            of the freshly built graph (rows, lane width, skipped records)."
    )]
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
