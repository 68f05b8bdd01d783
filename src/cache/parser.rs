//! cache::parser
//!
//! Streaming parser for raw log output.
//!
//! # Wire layout
//!
//! Records are delimited by `\x1e` (record separator) and fields by `\x1f`
//! (unit separator), in the fixed order: identity, parent identities
//! (space-separated), committer, author, epoch seconds, short log, long
//! log, signature status, signature key. [`LOG_FORMAT`] is the matching
//! `git log --pretty=format:` string.
//!
//! # Error posture
//!
//! A malformed record is skipped, logged, and counted; parsing never
//! aborts a pass. A trailing partial record (fetch truncated at a buffer
//! boundary) is buffered across [`LogParser::feed`] calls and only counted
//! as skipped by [`LogParser::finish`] if it never completes.

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::warn;

use super::record::{CommitRecord, Signature, SignatureStatus};
use crate::core::types::CommitId;

/// `git log --pretty=format:` string producing the wire layout.
pub const LOG_FORMAT: &str =
    "%H%x1f%P%x1f%cn <%ce>%x1f%an <%ae>%x1f%at%x1f%s%x1f%b%x1f%G?%x1f%GK%x1e";

/// Field separator within a record.
pub const FIELD_SEP: char = '\x1f';

/// Record separator between commits.
pub const RECORD_SEP: char = '\x1e';

/// Number of fields in one record.
const FIELD_COUNT: usize = 9;

/// Why a record was rejected. Recovered locally, never propagated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 9 fields, got {0}")]
    FieldCount(usize),

    #[error("bad commit id: {0}")]
    BadId(String),

    #[error("bad parent id: {0}")]
    BadParent(String),

    #[error("bad timestamp: {0}")]
    BadTimestamp(String),
}

/// Streaming parser over chunked raw log text.
///
/// # Example
///
/// ```
/// use lanework::cache::parser::LogParser;
///
/// let mut parser = LogParser::new();
/// let chunk = format!(
///     "{}\u{1f}\u{1f}c <c@e>\u{1f}a <a@e>\u{1f}100\u{1f}init\u{1f}\u{1f}N\u{1f}\u{1e}",
///     "a".repeat(40),
/// );
/// let records = parser.feed(&chunk);
/// assert_eq!(records.len(), 1);
/// assert_eq!(parser.finish(), 0);
/// ```
#[derive(Debug, Default)]
pub struct LogParser {
    buffer: String,
    skipped: usize,
}

impl LogParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw text, returning every record completed by it.
    ///
    /// Incomplete trailing data is buffered for the next call.
    pub fn feed(&mut self, chunk: &str) -> Vec<CommitRecord> {
        self.buffer.push_str(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.find(RECORD_SEP) {
            let raw: String = self.buffer.drain(..=pos).collect();
            let raw = raw.trim_end_matches(RECORD_SEP);
            // git log separates entries with a newline after the record
            let raw = raw.trim_start_matches('\n');
            if raw.is_empty() {
                continue;
            }
            match parse_record(raw) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(error = %err, "skipping malformed log record");
                    self.skipped += 1;
                }
            }
        }
        records
    }

    /// Finish the stream, returning the total number of skipped records.
    ///
    /// A non-empty remainder is a truncated record and counts as skipped.
    pub fn finish(&mut self) -> usize {
        if !self.buffer.trim().is_empty() {
            warn!(
                bytes = self.buffer.len(),
                "discarding truncated trailing record"
            );
            self.skipped += 1;
        }
        self.buffer.clear();
        self.skipped
    }

    /// Records skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Parse a complete raw log in one call.
///
/// Returns the parsed records and the number of skipped (malformed or
/// truncated) records.
pub fn parse_log(text: &str) -> (Vec<CommitRecord>, usize) {
    let mut parser = LogParser::new();
    let records = parser.feed(text);
    let skipped = parser.finish();
    (records, skipped)
}

/// Parse one delimited record.
fn parse_record(raw: &str) -> Result<CommitRecord, RecordError> {
    let fields: Vec<&str> = raw.split(FIELD_SEP).collect();
    if fields.len() != FIELD_COUNT {
        return Err(RecordError::FieldCount(fields.len()));
    }

    let id = CommitId::new(fields[0]).map_err(|_| RecordError::BadId(fields[0].to_string()))?;

    let mut parent_ids = Vec::new();
    for parent in fields[1].split_whitespace() {
        parent_ids
            .push(CommitId::new(parent).map_err(|_| RecordError::BadParent(parent.to_string()))?);
    }

    let secs: i64 = fields[4]
        .trim()
        .parse()
        .map_err(|_| RecordError::BadTimestamp(fields[4].to_string()))?;
    let commit_date: DateTime<Utc> = Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| RecordError::BadTimestamp(fields[4].to_string()))?;

    let mut record = CommitRecord::new(
        id,
        parent_ids,
        fields[2].to_string(),
        fields[3].to_string(),
        commit_date,
        fields[5].to_string(),
        fields[6].to_string(),
    );

    if let Some(status) = fields[7]
        .chars()
        .next()
        .and_then(SignatureStatus::from_status_byte)
    {
        record = record.with_signature(Signature {
            status,
            key: fields[8].to_string(),
        });
    }

    Ok(record)
}
