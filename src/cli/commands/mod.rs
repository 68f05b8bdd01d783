//! cli::commands
//!
//! Command implementations.

mod graph;
mod status;

pub use graph::graph;
pub use status::status;

use std::path::Path;

use crate::git::Git;

/// Open the repository for a command, honoring `--cwd`.
pub(crate) fn open_repo(cwd: Option<&Path>) -> anyhow::Result<Git> {
    let path = cwd.unwrap_or_else(|| Path::new("."));
    Ok(Git::open(path)?)
}
