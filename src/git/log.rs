//! git::log
//!
//! Raw log acquisition.
//!
//! The cache consumes text, not repository objects: the concrete source
//! spawns the configured git binary with the fixed record layout from
//! [`crate::cache::parser::LOG_FORMAT`] and hands the captured output to
//! the parser. [`LogSource`] is the seam; tests and embedders can supply
//! a [`FixedLogSource`] instead of a live repository.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::GitError;
use crate::cache::parser::LOG_FORMAT;

/// A provider of raw, field-delimited log text.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch the raw log, newest first, optionally capped at `limit`
    /// commits.
    async fn fetch(&self, limit: Option<u32>) -> Result<String, GitError>;
}

/// Fetches the raw log by running the git binary.
pub struct CliLogSource {
    workdir: PathBuf,
    git_binary: String,
}

impl CliLogSource {
    /// Create a source for a working directory, using the given binary
    /// (normally `"git"`, overridable through configuration).
    pub fn new(workdir: impl Into<PathBuf>, git_binary: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            git_binary: git_binary.into(),
        }
    }
}

#[async_trait]
impl LogSource for CliLogSource {
    async fn fetch(&self, limit: Option<u32>) -> Result<String, GitError> {
        let mut cmd = Command::new(&self.git_binary);
        cmd.arg("-C")
            .arg(&self.workdir)
            .arg("log")
            .arg("--all")
            .arg(format!("--pretty=format:{LOG_FORMAT}"));
        if let Some(limit) = limit {
            cmd.arg(format!("-n{limit}"));
        }

        debug!(workdir = %self.workdir.display(), ?limit, "fetching raw log");

        let output = cmd.output().await.map_err(|e| GitError::Internal {
            message: format!("failed to spawn {}: {e}", self.git_binary),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("does not have any commits yet")
                || stderr.contains("bad default revision")
            {
                // Unborn branch: no history is a valid answer
                return Ok(String::new());
            }
            return Err(GitError::CommandFailed {
                status: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        // Commit messages are not guaranteed to be UTF-8; replace rather
        // than fail, the parser handles the rest.
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// A source that returns a fixed string. For tests and embedders that
/// already hold log text.
pub struct FixedLogSource {
    text: String,
}

impl FixedLogSource {
    /// Wrap prepared raw log text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl LogSource for FixedLogSource {
    async fn fetch(&self, _limit: Option<u32>) -> Result<String, GitError> {
        Ok(self.text.clone())
    }
}
