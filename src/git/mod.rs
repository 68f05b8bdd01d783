//! git
//!
//! Repository access via git2.
//!
//! This module is the **single doorway** to the repository: no other
//! module imports `git2`. The cache itself never reads the repository
//! directly; it consumes raw log text (see [`log`]) and the working-tree
//! state reported here.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::BareRepo`]: Bare repositories have no working tree
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CommandFailed`]: The git binary reported a failure
//!
//! # Example
//!
//! ```ignore
//! use lanework::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let status = git.status()?;
//! println!("dirty: {}", status.dirty);
//! ```

pub mod log;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchName, CommitId};

/// Errors from repository access.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// The git binary exited with a failure.
    #[error("git exited with {status:?}: {stderr}")]
    CommandFailed {
        /// Exit code, when the process terminated normally
        status: Option<i32>,
        /// Captured stderr, trimmed
        stderr: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

/// Resolved HEAD state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadInfo {
    /// Current branch, `None` when HEAD is detached.
    pub branch: Option<BranchName>,
    /// Tip commit, `None` on an unborn branch.
    pub tip: Option<CommitId>,
}

/// Working-tree report: dirty flag plus the resolved HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Whether the working tree has uncommitted changes (staged,
    /// unstaged, or untracked).
    pub dirty: bool,
    /// The resolved HEAD.
    pub head: HeadInfo,
}

/// The repository doorway.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("workdir", &self.repo.workdir())
            .finish()
    }
}

impl Git {
    /// Open the repository containing `path`, searching upward.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] when no repository contains `path`
    /// - [`GitError::BareRepo`] for bare repositories
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotARepo {
                    path: path.to_path_buf(),
                }
            } else {
                GitError::Internal {
                    message: e.message().to_string(),
                }
            }
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Path to the `.git` directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Path to the working directory.
    pub fn workdir(&self) -> &Path {
        // Bare repositories are rejected in `open`
        self.repo.workdir().expect("non-bare repository")
    }

    /// Resolve HEAD to a branch name and tip.
    ///
    /// An unborn branch (fresh `git init`) yields `tip: None` with the
    /// branch taken from the symbolic HEAD; a detached HEAD yields
    /// `branch: None`.
    pub fn head(&self) -> Result<HeadInfo, GitError> {
        match self.repo.head() {
            Ok(reference) => {
                let branch = reference
                    .shorthand()
                    .filter(|name| *name != "HEAD")
                    .and_then(|name| BranchName::new(name).ok());
                let tip = reference
                    .target()
                    .map(|oid| {
                        CommitId::new(oid.to_string()).map_err(|e| GitError::Internal {
                            message: e.to_string(),
                        })
                    })
                    .transpose()?;
                Ok(HeadInfo { branch, tip })
            }
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(HeadInfo {
                    branch: self.symbolic_head_branch(),
                    tip: None,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Branch name from the symbolic HEAD ref, for unborn branches.
    fn symbolic_head_branch(&self) -> Option<BranchName> {
        let head = self.repo.find_reference("HEAD").ok()?;
        let target = head.symbolic_target()?;
        let name = target.strip_prefix("refs/heads/")?;
        BranchName::new(name).ok()
    }

    /// Report the working-tree state: dirty flag plus resolved HEAD.
    ///
    /// Untracked files count as dirty; ignored files do not.
    pub fn status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let dirty = !statuses.is_empty();

        Ok(WorktreeStatus {
            dirty,
            head: self.head()?,
        })
    }
}
