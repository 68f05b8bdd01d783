//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`CommitId`] - Validated commit identity (content hash)
//! - [`BranchName`] - Validated Git branch name
//! - [`Fingerprint`] - Raw-log hash for no-op fetch detection
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use lanework::core::types::{BranchName, CommitId};
//!
//! // Valid constructions
//! let id = CommitId::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let branch = BranchName::new("feature/my-branch").unwrap();
//!
//! // Invalid constructions fail at creation time
//! assert!(CommitId::new("not-a-sha").is_err());
//! assert!(BranchName::new("invalid..name").is_err());
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
}

/// A validated commit identity (SHA-1 or SHA-256 content hash).
///
/// Identities are normalized to lowercase and stored behind an `Arc` so
/// clones are cheap; the same identity is shared across parent lists,
/// child sets, and lane tables.
///
/// Two sentinel identities are reserved:
/// - [`CommitId::zero`] marks the working-tree node (uncommitted changes)
/// - [`CommitId::init`] marks a synthetic root injected when history is
///   truncated
///
/// # Example
///
/// ```
/// use lanework::core::types::CommitId;
///
/// // Create from hex string (normalized to lowercase)
/// let id = CommitId::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(id.as_str(), "abc123def4567890abc123def4567890abc12345");
///
/// // Get abbreviated form
/// assert_eq!(id.short(7), "abc123d");
///
/// // Sentinels
/// assert!(CommitId::zero().is_zero());
/// assert!(CommitId::init().is_init());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(Arc<str>);

impl CommitId {
    /// The zero identity (40 zeros): the working-tree sentinel.
    const ZERO: &'static str = "0000000000000000000000000000000000000000";

    /// The init identity (40 ones): a synthetic root for truncated history.
    const INIT: &'static str = "1111111111111111111111111111111111111111";

    /// Create a new validated commit id.
    ///
    /// The id is normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitId` if the string is not a valid
    /// hex identity of 40 or 64 characters.
    pub fn new(id: impl AsRef<str>) -> Result<Self, TypeError> {
        let id = id.as_ref().to_ascii_lowercase();
        Self::validate(&id)?;
        Ok(Self(id.into()))
    }

    /// The working-tree sentinel identity (40 zeros).
    pub fn zero() -> Self {
        Self(Self::ZERO.into())
    }

    /// The synthetic-root identity (40 ones).
    pub fn init() -> Self {
        Self(Self::INIT.into())
    }

    /// Check if this is the working-tree sentinel identity.
    pub fn is_zero(&self) -> bool {
        self.0.as_ref() == Self::ZERO
    }

    /// Check if this is the synthetic-root identity.
    pub fn is_init(&self) -> bool {
        self.0.as_ref() == Self::INIT
    }

    /// Get an abbreviated form of the id.
    ///
    /// Returns the first `len` characters. If `len` exceeds the id length,
    /// returns the full id.
    ///
    /// # Example
    ///
    /// ```
    /// use lanework::core::types::CommitId;
    ///
    /// let id = CommitId::new("abc123def4567890abc123def4567890abc12345").unwrap();
    /// assert_eq!(id.short(7), "abc123d");
    /// ```
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Validate a commit id.
    fn validate(id: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if id.len() != 40 && id.len() != 64 {
            return Err(TypeError::InvalidCommitId(format!(
                "expected 40 or 64 hex characters, got {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidCommitId(
                "commit id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the commit id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.0.as_ref().to_string()
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use lanework::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's
    /// refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Validate a branch name against Git's refname rules.
    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }

        // "@" alone is reserved
        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }

        if name.starts_with('.') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '.'".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }

        if name.ends_with(".lock") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot end with '.lock'".into(),
            ));
        }
        if name.ends_with('/') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot end with '/'".into(),
            ));
        }

        if name.contains("..") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '..'".into(),
            ));
        }
        if name.contains("@{") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '@{'".into(),
            ));
        }
        if name.contains("//") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '//'".into(),
            ));
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        for c in INVALID_CHARS {
            if name.contains(c) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{c}'"
                )));
            }
        }

        for c in name.chars() {
            if c.is_ascii_control() {
                return Err(TypeError::InvalidBranchName(
                    "branch name cannot contain control characters".into(),
                ));
            }
        }

        for component in name.split('/') {
            if component.is_empty() {
                continue;
            }
            if component.starts_with('.') {
                return Err(TypeError::InvalidBranchName(
                    "path component cannot start with '.'".into(),
                ));
            }
            if component.ends_with(".lock") {
                return Err(TypeError::InvalidBranchName(
                    "path component cannot end with '.lock'".into(),
                ));
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stable hash over a fetched raw log, used to detect no-op refreshes.
///
/// When two fetches hash to the same fingerprint the graph cannot have
/// changed, and reconciliation is skipped entirely.
///
/// # Example
///
/// ```
/// use lanework::core::types::Fingerprint;
///
/// let fp1 = Fingerprint::of_bytes(b"raw log text");
/// let fp2 = Fingerprint::of_bytes(b"raw log text");
/// assert_eq!(fp1, fp2);
///
/// let fp3 = Fingerprint::of_bytes(b"different text");
/// assert_ne!(fp1, fp3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint over raw bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// The fingerprint of an empty input.
    pub fn empty() -> Self {
        Self::of_bytes(b"")
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
