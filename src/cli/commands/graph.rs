//! cli::commands::graph
//!
//! Build and render the lane-annotated commit graph.

use anyhow::Context as _;

use crate::cache::{CacheError, GraphCache, WorkingTree};
use crate::core::config::Config;
use crate::git::log::{CliLogSource, LogSource};
use crate::ui::output::{self, Verbosity};
use crate::ui::render::render_graph;

use super::open_repo;

/// Execute `lw graph`.
pub async fn graph(
    cwd: Option<&std::path::Path>,
    limit: Option<u32>,
    json: bool,
    no_working_tree: bool,
    verbosity: Verbosity,
) -> anyhow::Result<()> {
    let git = open_repo(cwd)?;
    let config = Config::load(git.git_dir())?;

    let status = git.status().context("failed to read working-tree status")?;
    let working_tree = if status.dirty && config.include_working_tree && !no_working_tree {
        Some(WorkingTree {
            tip: status.head.tip.clone(),
        })
    } else {
        None
    };

    let source = CliLogSource::new(git.workdir(), config.git_binary.clone());
    let raw_log = source
        .fetch(limit.or(config.log_limit))
        .await
        .context("failed to fetch raw log")?;

    let cache = GraphCache::new();
    match cache.refresh(&raw_log, working_tree.as_ref()) {
        Ok(_) => {}
        Err(CacheError::EmptyRepository) => {
            output::print("repository has no commits yet", verbosity);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let snapshot = cache.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot.nodes())?);
    } else {
        print!("{}", render_graph(&snapshot));
        if snapshot.skipped_records() > 0 {
            output::warn(
                format!("{} malformed records skipped", snapshot.skipped_records()),
                verbosity,
            );
        }
    }

    Ok(())
}
