//! cli::commands::status
//!
//! Repository state and graph statistics.

use anyhow::Context as _;

use crate::cache::{CacheError, GraphCache, WorkingTree};
use crate::core::config::Config;
use crate::git::log::{CliLogSource, LogSource};
use crate::ui::output::{self, Verbosity};

use super::open_repo;

/// Execute `lw status`.
pub async fn status(
    cwd: Option<&std::path::Path>,
    json: bool,
    verbosity: Verbosity,
) -> anyhow::Result<()> {
    let git = open_repo(cwd)?;
    let config = Config::load(git.git_dir())?;

    let status = git.status().context("failed to read working-tree status")?;
    let working_tree = if status.dirty && config.include_working_tree {
        Some(WorkingTree {
            tip: status.head.tip.clone(),
        })
    } else {
        None
    };

    let source = CliLogSource::new(git.workdir(), config.git_binary.clone());
    let raw_log = source
        .fetch(config.log_limit)
        .await
        .context("failed to fetch raw log")?;

    let cache = GraphCache::new();
    let empty = match cache.refresh(&raw_log, working_tree.as_ref()) {
        Ok(_) => false,
        Err(CacheError::EmptyRepository) => true,
        Err(e) => return Err(e.into()),
    };
    let snapshot = cache.snapshot();

    let branch = status
        .head
        .branch
        .as_ref()
        .map(|b| b.to_string())
        .unwrap_or_else(|| "(detached)".to_string());
    let tip = status
        .head
        .tip
        .as_ref()
        .map(|t| t.short(12).to_string())
        .unwrap_or_else(|| "(unborn)".to_string());

    if json {
        let value = serde_json::json!({
            "branch": branch,
            "tip": tip,
            "dirty": status.dirty,
            "commits": snapshot.len(),
            "max_lane_width": snapshot.max_lane_width(),
            "skipped_records": snapshot.skipped_records(),
            "generation": snapshot.generation(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    output::print(format!("branch: {branch}"), verbosity);
    output::print(format!("tip: {tip}"), verbosity);
    output::print(
        format!("dirty: {}", if status.dirty { "yes" } else { "no" }),
        verbosity,
    );
    if empty {
        output::print("commits: none", verbosity);
    } else {
        output::print(format!("commits: {}", snapshot.len()), verbosity);
        output::print(
            format!("lane width: {}", snapshot.max_lane_width()),
            verbosity,
        );
        if snapshot.skipped_records() > 0 {
            output::warn(
                format!("{} malformed records skipped", snapshot.skipped_records()),
                verbosity,
            );
        }
    }

    Ok(())
}
