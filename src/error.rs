//! Error taxonomy for the tracker, the store, and a reconciliation pass.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures talking to the remote issue tracker.
///
/// Serializable so cassettes can record and replay typed failures.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum IssueError {
    /// No issue with the requested identity exists.
    #[error("issue '{title}' not found in {repo}")]
    NotFound {
        /// `owner/name` of the repository searched.
        repo: String,
        /// Title (or `#number`) that was looked up.
        title: String,
    },

    /// Network failure, rate limit, or server-side error. Safe to retry.
    #[error("transient tracker failure: {reason}")]
    Transient {
        /// What went wrong.
        reason: String,
        /// Server-provided hint for when to try again.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after: Option<Duration>,
    },

    /// Auth failure, malformed repository, or a request the tracker rejects.
    #[error("tracker rejected the request: {reason}")]
    Permanent {
        /// What went wrong.
        reason: String,
    },
}

impl IssueError {
    /// Creates a not-found error.
    pub fn not_found(repo: impl Into<String>, title: impl Into<String>) -> Self {
        Self::NotFound { repo: repo.into(), title: title.into() }
    }

    /// Creates a transient error without a retry hint.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient { reason: reason.into(), retry_after: None }
    }

    /// Creates a permanent error.
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Permanent { reason: reason.into() }
    }

    /// Whether this is the "no such issue" case.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Server-provided retry hint, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Failures reading or writing desired-state records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The record does not exist.
    #[error("record {key} not found")]
    NotFound {
        /// `namespace/name` of the record.
        key: String,
    },

    /// The write was based on a stale resource version.
    #[error("conflict writing {key}: expected resource version {expected}, found {found}")]
    Conflict {
        /// `namespace/name` of the record.
        key: String,
        /// Version the writer read.
        expected: u64,
        /// Version currently stored.
        found: u64,
    },

    /// The record is being deleted and no longer accepts spec changes.
    #[error("record {key} is being deleted")]
    Terminating {
        /// `namespace/name` of the record.
        key: String,
    },

    /// The backing medium failed.
    #[error("store I/O failed: {reason}")]
    Io {
        /// What went wrong.
        reason: String,
    },

    /// A stored manifest could not be parsed or rendered.
    #[error("malformed record {key}: {reason}")]
    Malformed {
        /// `namespace/name` or path of the record.
        key: String,
        /// Parse or render failure.
        reason: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(key: impl ToString) -> Self {
        Self::NotFound { key: key.to_string() }
    }

    /// Creates an I/O error.
    pub fn io(reason: impl Into<String>) -> Self {
        Self::Io { reason: reason.into() }
    }

    /// Creates a malformed-record error.
    pub fn malformed(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::Malformed { key: key.to_string(), reason: reason.into() }
    }
}

/// Why a reconciliation pass did not complete cleanly.
///
/// Every variant is surfaced to the runner, which requeues with backoff.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The remote tracker call failed.
    #[error(transparent)]
    Issue(#[from] IssueError),

    /// Reading or writing the record (metadata/finalizers) failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote side effect succeeded but the status write did not.
    #[error("status write failed: {0}")]
    StatusWrite(#[source] StoreError),

    /// The pass exceeded its deadline and was abandoned.
    #[error("pass exceeded its {0:?} deadline")]
    Timeout(Duration),
}

impl ReconcileError {
    /// Server-provided retry hint, if the failure carries one.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Issue(e) => e.retry_after(),
            _ => None,
        }
    }
}
