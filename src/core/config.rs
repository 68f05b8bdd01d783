//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Lanework reads a single repository-level config file,
//! `.git/lanework/config.toml`. Every field has a default, so the file is
//! optional; a missing file yields the default configuration.
//!
//! # Example
//!
//! ```no_run
//! use lanework::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("/path/to/repo/.git")).unwrap();
//! println!("log limit: {:?}", config.log_limit);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
}

/// Repository-level configuration.
///
/// Deserialized from `.git/lanework/config.toml`; unknown keys are
/// rejected so typos surface instead of being silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Maximum number of commits to request per fetch. `None` fetches
    /// the full history.
    pub log_limit: Option<u32>,

    /// Inject the working-tree sentinel when the tree is dirty.
    pub include_working_tree: bool,

    /// Git binary used for raw log fetches.
    pub git_binary: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_limit: None,
            include_working_tree: true,
            git_binary: "git".to_string(),
        }
    }
}

impl Config {
    /// Relative path of the config file inside the git directory.
    pub const FILE: &'static str = "lanework/config.toml";

    /// Load configuration from `<git_dir>/lanework/config.toml`.
    ///
    /// A missing file is not an error; defaults are returned.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ReadError`] if the file exists but cannot be read
    /// - [`ConfigError::ParseError`] if the file is not valid TOML or
    ///   contains unknown keys
    pub fn load(git_dir: &Path) -> Result<Self, ConfigError> {
        let path = git_dir.join(Self::FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }
}
