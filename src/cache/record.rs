//! cache::record
//!
//! Immutable commit records parsed from raw log output.
//!
//! A [`CommitRecord`] is created once per parse and never mutated. All
//! derived state (children, positions, lanes) lives on the graph node that
//! wraps the record, never on the record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::CommitId;

/// Verification status of a commit signature, from `%G?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    /// Good signature.
    Good,
    /// Bad signature.
    Bad,
    /// Good signature with unknown validity.
    UnknownValidity,
    /// Good signature that has expired.
    Expired,
    /// Good signature made by an expired key.
    ExpiredKey,
    /// Good signature made by a revoked key.
    RevokedKey,
    /// Signature could not be checked (e.g. missing key).
    CannotCheck,
}

impl SignatureStatus {
    /// Map a `%G?` status byte to a signature status.
    ///
    /// Returns `None` for `N` (no signature) and for anything unrecognized.
    pub fn from_status_byte(b: char) -> Option<Self> {
        match b {
            'G' => Some(Self::Good),
            'B' => Some(Self::Bad),
            'U' => Some(Self::UnknownValidity),
            'X' => Some(Self::Expired),
            'Y' => Some(Self::ExpiredKey),
            'R' => Some(Self::RevokedKey),
            'E' => Some(Self::CannotCheck),
            _ => None,
        }
    }
}

/// Signature metadata attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Verification status.
    pub status: SignatureStatus,
    /// Key used for the signature, if git reported one.
    pub key: String,
}

/// An immutable commit parsed from one record of raw log output.
///
/// Field order mirrors the fixed wire layout: identity, parent identities,
/// committer, author, commit date, short log, long log, signature.
///
/// # Example
///
/// ```
/// use lanework::cache::record::CommitRecord;
/// use lanework::core::types::CommitId;
/// use chrono::{TimeZone, Utc};
///
/// let tip = CommitId::new("abc123def4567890abc123def4567890abc12345").unwrap();
/// let record = CommitRecord::new(
///     tip.clone(),
///     vec![],
///     "Ada <ada@example.com>".into(),
///     "Ada <ada@example.com>".into(),
///     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     "initial commit".into(),
///     String::new(),
/// );
/// assert_eq!(record.id(), &tip);
/// assert_eq!(record.parent_count(), 0);
/// assert!(record.contains("initial"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    id: CommitId,
    parent_ids: Vec<CommitId>,
    committer: String,
    author: String,
    commit_date: DateTime<Utc>,
    short_log: String,
    long_log: String,
    signature: Option<Signature>,
}

impl CommitRecord {
    /// Create an unsigned record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CommitId,
        parent_ids: Vec<CommitId>,
        committer: String,
        author: String,
        commit_date: DateTime<Utc>,
        short_log: String,
        long_log: String,
    ) -> Self {
        Self {
            id,
            parent_ids,
            committer,
            author,
            commit_date,
            short_log,
            long_log,
            signature: None,
        }
    }

    /// Attach signature metadata.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Build the working-tree sentinel record.
    ///
    /// The sentinel carries the zero identity and a single parent equal to
    /// the current branch tip. An unborn repository has no tip, so the
    /// sentinel may be a root.
    pub fn working_tree(tip: Option<CommitId>) -> Self {
        Self {
            id: CommitId::zero(),
            parent_ids: tip.into_iter().collect(),
            committer: String::new(),
            author: String::new(),
            commit_date: Utc::now(),
            short_log: "Local changes".to_string(),
            long_log: String::new(),
            signature: None,
        }
    }

    /// The commit identity.
    pub fn id(&self) -> &CommitId {
        &self.id
    }

    /// Ordered parent identities; the first parent is the mainline.
    pub fn parent_ids(&self) -> &[CommitId] {
        &self.parent_ids
    }

    /// Number of parents (0 root, 1 normal, >=2 merge).
    pub fn parent_count(&self) -> usize {
        self.parent_ids.len()
    }

    /// The parent at `idx`, if any.
    pub fn parent(&self, idx: usize) -> Option<&CommitId> {
        self.parent_ids.get(idx)
    }

    /// The mainline parent, if any.
    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parent_ids.first()
    }

    /// Committer identity string.
    pub fn committer(&self) -> &str {
        &self.committer
    }

    /// Author identity string.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Commit date, second resolution.
    pub fn commit_date(&self) -> DateTime<Utc> {
        self.commit_date
    }

    /// First line of the message.
    pub fn short_log(&self) -> &str {
        &self.short_log
    }

    /// Remainder of the message.
    pub fn long_log(&self) -> &str {
        &self.long_log
    }

    /// Full message: short log and trimmed long log joined.
    pub fn full_log(&self) -> String {
        let long = self.long_log.trim();
        if long.is_empty() {
            self.short_log.clone()
        } else {
            format!("{}\n\n{}", self.short_log, long)
        }
    }

    /// Whether this is the working-tree sentinel.
    pub fn is_working_tree(&self) -> bool {
        self.id.is_zero()
    }

    /// Whether this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Signature metadata, if the commit is signed.
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Whether the commit carries a signature.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Case-insensitive substring search over identity, message, author
    /// and committer. Used by the filter consumers.
    pub fn contains(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let needle = text.to_lowercase();
        self.id.as_str().contains(&needle)
            || self.short_log.to_lowercase().contains(&needle)
            || self.long_log.to_lowercase().contains(&needle)
            || self.author.to_lowercase().contains(&needle)
            || self.committer.to_lowercase().contains(&needle)
    }
}
